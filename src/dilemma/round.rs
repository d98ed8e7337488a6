//! One round of the dilemma: a bounded conversation, then both choices.
//!
//! ```text
//! a: [context] + scenario + "first message"
//! b: [context] + scenario + a's message
//! a, b, a, b ...           (turns - 2 exchanges)
//! a, b                     (last message)
//! choose(a), choose(b)     (with re-prompts on unclear answers)
//! ```

use crate::dilemma::choice::{Choice, parse_choice, score_round};
use crate::dilemma::gateway::{ParticipantGateway, ProgressReporter};
use crate::dilemma::request::{Participants, Seat};
use crate::error::Result;
use crate::utils::truncate_str;

// ─── Prompts ─────────────────────────────────────────────────

pub const SCENARIO: &str = "You and a friend have been arrested and will each have to choose \
whether to stay silent or testify against your friend.\n\n\
- If you testify, but your friend does not you will go free\n\
- If you stay silent, but your friend testifies, you will serve three years\n\
- If you both stay silent you will serve one year in prison\n\
- If you both testify against each other, you will serve two years\n\n\
Before you make your choice you can have a brief conversation \
with your friend via messages passed by the guard.\n\n";

pub const CHOICE_PROMPT: &str = "Make your choice by responding with 'testify' or 'silence'";

pub const RETRY_PROMPT: &str =
    "Your choice was not recognised. make your choice by responding with only 'testify' or 'silence'";

pub const DEFAULT_CHOICE_RETRIES: u32 = 5;

/// Longest reply echoed into the log.
const LOG_LIMIT: usize = 500;

fn opening_prompt(context: &str) -> String {
    format!("{}{}Provide your first message to your friend.", context, SCENARIO)
}

fn first_reply_prompt(context: &str, message: &str) -> String {
    format!(
        "{}{}Your friend said: {}, what is your response?",
        context, SCENARIO, message
    )
}

fn reply_prompt(message: &str) -> String {
    format!("Your friend said: {}, what is your response?", message)
}

fn last_reply_prompt(message: &str) -> String {
    format!(
        "Your friend said: {}, this is the last message you can send, what is your response?",
        message
    )
}

// ─── Round Record ────────────────────────────────────────────

/// Outcome of a finished round. Read-only once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundRecord {
    choices: [Choice; 2],
    scores: [u32; 2],
}

impl RoundRecord {
    /// Score a pair of choices.
    pub fn new(a: Choice, b: Choice) -> Self {
        let (score_a, score_b) = score_round(a, b);
        Self {
            choices: [a, b],
            scores: [score_a, score_b],
        }
    }

    pub fn choice(&self, seat: Seat) -> Choice {
        self.choices[seat.index()]
    }

    pub fn score(&self, seat: Seat) -> u32 {
        self.scores[seat.index()]
    }

    /// What `seat` is told about this round at the start of the next one.
    pub fn context_for(&self, seat: Seat) -> String {
        format!(
            "Last round you chose '{}' and your friend chose '{}' so you were sentenced to {} years.\n\n",
            self.choice(seat),
            self.choice(seat.other()),
            self.score(seat)
        )
    }
}

// ─── Choice Extraction ───────────────────────────────────────

/// Ask `participant` for its choice, re-prompting up to `retries` times
/// while the reply is unclear.
///
/// Running out of retries yields [`Choice::Unrecognised`]; only transport
/// failures are errors.
pub async fn extract_choice(
    gateway: &dyn ParticipantGateway,
    participant: &str,
    retries: u32,
) -> Result<Choice> {
    let reply = gateway.send(CHOICE_PROMPT, participant, false).await?;
    let mut choice = parse_choice(&reply);
    tracing::debug!(participant, attempt = 0, reply = %truncate_str(&reply, LOG_LIMIT), %choice, "Choice reply");

    let mut attempt = 0;
    while choice == Choice::Unrecognised && attempt < retries {
        attempt += 1;
        tracing::warn!(participant, attempt, "Choice not recognised, asking again");
        let reply = gateway.send(RETRY_PROMPT, participant, false).await?;
        choice = parse_choice(&reply);
        tracing::debug!(participant, attempt, reply = %truncate_str(&reply, LOG_LIMIT), %choice, "Choice reply");
    }

    if choice == Choice::Unrecognised {
        tracing::warn!(participant, retries, "No recognisable choice, scoring as unrecognised");
    }
    Ok(choice)
}

// ─── Round Orchestrator ──────────────────────────────────────

/// Drives a single round against a pair of participants.
pub struct RoundOrchestrator<'a> {
    gateway: &'a dyn ParticipantGateway,
    reporter: &'a dyn ProgressReporter,
    participants: &'a Participants,
    choice_retries: u32,
}

impl<'a> RoundOrchestrator<'a> {
    pub fn new(
        gateway: &'a dyn ParticipantGateway,
        reporter: &'a dyn ProgressReporter,
        participants: &'a Participants,
        choice_retries: u32,
    ) -> Self {
        Self {
            gateway,
            reporter,
            participants,
            choice_retries,
        }
    }

    /// Play the conversation and collect `[a, b]` choices.
    ///
    /// `turns` is the number of messages each participant sends; callers
    /// guarantee it is at least 2.
    pub async fn run_round(&self, turns: usize, prior: Option<&RoundRecord>) -> Result<[Choice; 2]> {
        let context = |seat: Seat| prior.map(|r| r.context_for(seat)).unwrap_or_default();

        let mut response = self.turn(Seat::A, opening_prompt(&context(Seat::A))).await?;
        response = self
            .turn(Seat::B, first_reply_prompt(&context(Seat::B), &response))
            .await?;

        for _ in 0..turns.saturating_sub(2) {
            for seat in Seat::BOTH {
                response = self.turn(seat, reply_prompt(&response)).await?;
            }
        }

        for seat in Seat::BOTH {
            response = self.turn(seat, last_reply_prompt(&response)).await?;
        }

        self.reporter
            .report("The prisoners will now make their choice...")
            .await;

        let a = extract_choice(
            self.gateway,
            self.participants.address(Seat::A),
            self.choice_retries,
        )
        .await?;
        let b = extract_choice(
            self.gateway,
            self.participants.address(Seat::B),
            self.choice_retries,
        )
        .await?;

        Ok([a, b])
    }

    async fn turn(&self, seat: Seat, prompt: String) -> Result<String> {
        let response = self
            .gateway
            .send(&prompt, self.participants.address(seat), false)
            .await?;
        tracing::info!(role = %seat, "{}", truncate_str(&response, LOG_LIMIT));
        self.reporter.report(&format!("{}: {}", seat, response)).await;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dilemma::gateway::{MockParticipantGateway, TracingReporter};
    use crate::error::GuardError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingReporter {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProgressReporter for RecordingReporter {
        async fn report(&self, text: &str) {
            self.lines.lock().expect("lock").push(text.to_string());
        }
    }

    #[test]
    fn test_context_for_each_seat() {
        let record = RoundRecord {
            choices: [Choice::Testify, Choice::Silence],
            scores: [10, 1],
        };
        assert_eq!(
            record.context_for(Seat::A),
            "Last round you chose 'testify' and your friend chose 'silence' so you were sentenced to 10 years.\n\n"
        );
        assert_eq!(
            record.context_for(Seat::B),
            "Last round you chose 'silence' and your friend chose 'testify' so you were sentenced to 1 years.\n\n"
        );
    }

    #[test]
    fn test_round_record_scores_choices() {
        let record = RoundRecord::new(Choice::Silence, Choice::Testify);
        assert_eq!(record.score(Seat::A), 3);
        assert_eq!(record.score(Seat::B), 0);
        assert_eq!(record.choice(Seat::B), Choice::Testify);
    }

    #[tokio::test]
    async fn test_first_reply_recognised_never_retries() {
        let mut gateway = MockParticipantGateway::new();
        gateway
            .expect_send()
            .withf(|prompt, participant, new_conversation| {
                prompt == CHOICE_PROMPT && participant == "http://a" && !*new_conversation
            })
            .times(1)
            .returning(|_, _, _| Ok(" Silence\n".to_string()));

        let choice = extract_choice(&gateway, "http://a", DEFAULT_CHOICE_RETRIES)
            .await
            .expect("choice");
        assert_eq!(choice, Choice::Silence);
    }

    #[tokio::test]
    async fn test_retries_until_recognised() {
        let mut gateway = MockParticipantGateway::new();
        let mut seq = mockall::Sequence::new();
        gateway
            .expect_send()
            .withf(|prompt, _, _| prompt == CHOICE_PROMPT)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok("I think I will testify".to_string()));
        gateway
            .expect_send()
            .withf(|prompt, _, _| prompt == RETRY_PROMPT)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok("hmm".to_string()));
        gateway
            .expect_send()
            .withf(|prompt, _, _| prompt == RETRY_PROMPT)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok("TESTIFY".to_string()));

        let choice = extract_choice(&gateway, "http://a", DEFAULT_CHOICE_RETRIES)
            .await
            .expect("choice");
        assert_eq!(choice, Choice::Testify);
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_unrecognised() {
        let mut gateway = MockParticipantGateway::new();
        gateway
            .expect_send()
            .withf(|prompt, _, _| prompt == CHOICE_PROMPT)
            .times(1)
            .returning(|_, _, _| Ok("maybe".to_string()));
        gateway
            .expect_send()
            .withf(|prompt, _, _| prompt == RETRY_PROMPT)
            .times(DEFAULT_CHOICE_RETRIES as usize)
            .returning(|_, _, _| Ok("still thinking".to_string()));

        let choice = extract_choice(&gateway, "http://a", DEFAULT_CHOICE_RETRIES)
            .await
            .expect("unrecognised is not an error");
        assert_eq!(choice, Choice::Unrecognised);
    }

    #[tokio::test]
    async fn test_zero_retry_budget_asks_once() {
        let mut gateway = MockParticipantGateway::new();
        gateway
            .expect_send()
            .times(1)
            .returning(|_, _, _| Ok("no".to_string()));

        let choice = extract_choice(&gateway, "http://a", 0).await.expect("choice");
        assert_eq!(choice, Choice::Unrecognised);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_from_extraction() {
        let mut gateway = MockParticipantGateway::new();
        gateway
            .expect_send()
            .times(1)
            .returning(|_, participant, _| Err(GuardError::transport(participant, "timed out")));

        let err = extract_choice(&gateway, "http://a", DEFAULT_CHOICE_RETRIES)
            .await
            .expect_err("transport");
        assert!(matches!(err, GuardError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_round_turn_order_and_prompts() {
        let calls: std::sync::Arc<Mutex<Vec<(String, String)>>> = Default::default();
        let recorded = calls.clone();
        let counter = std::sync::Arc::new(Mutex::new(0usize));

        let mut gateway = MockParticipantGateway::new();
        gateway
            .expect_send()
            .returning(move |prompt, participant, new_conversation| {
                assert!(!new_conversation);
                recorded
                    .lock()
                    .expect("lock")
                    .push((participant.to_string(), prompt.to_string()));
                if prompt == CHOICE_PROMPT {
                    let choice = if participant == "http://a" { "testify" } else { "silence" };
                    return Ok(choice.to_string());
                }
                let mut n = counter.lock().expect("lock");
                *n += 1;
                Ok(format!("msg{}", n))
            });

        let participants = Participants::new("http://a", "http://b");
        let prior = RoundRecord::new(Choice::Silence, Choice::Testify);
        let orchestrator =
            RoundOrchestrator::new(&gateway, &TracingReporter, &participants, DEFAULT_CHOICE_RETRIES);

        let choices = orchestrator.run_round(3, Some(&prior)).await.expect("round");
        assert_eq!(choices, [Choice::Testify, Choice::Silence]);

        let calls = calls.lock().expect("lock");
        let order: Vec<&str> = calls.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "http://a", "http://b", // opening
                "http://a", "http://b", // turns - 2 = 1 exchange
                "http://a", "http://b", // last message
                "http://a", "http://b", // choices
            ]
        );

        assert!(calls[0].1.starts_with(
            "Last round you chose 'silence' and your friend chose 'testify' so you were sentenced to 3 years.\n\n"
        ));
        assert!(calls[0].1.contains(SCENARIO));
        assert!(calls[0].1.ends_with("Provide your first message to your friend."));

        assert!(calls[1].1.starts_with(
            "Last round you chose 'testify' and your friend chose 'silence' so you were sentenced to 0 years.\n\n"
        ));
        assert!(calls[1].1.ends_with("Your friend said: msg1, what is your response?"));

        assert_eq!(calls[2].1, "Your friend said: msg2, what is your response?");
        assert_eq!(calls[3].1, "Your friend said: msg3, what is your response?");
        assert_eq!(
            calls[4].1,
            "Your friend said: msg4, this is the last message you can send, what is your response?"
        );
        assert_eq!(
            calls[5].1,
            "Your friend said: msg5, this is the last message you can send, what is your response?"
        );
        assert_eq!(calls[6].1, CHOICE_PROMPT);
        assert_eq!(calls[7].1, CHOICE_PROMPT);
    }

    #[tokio::test]
    async fn test_first_round_has_no_context() {
        let prompts: std::sync::Arc<Mutex<Vec<String>>> = Default::default();
        let recorded = prompts.clone();

        let mut gateway = MockParticipantGateway::new();
        gateway.expect_send().returning(move |prompt, _, _| {
            recorded.lock().expect("lock").push(prompt.to_string());
            Ok("silence".to_string())
        });

        let participants = Participants::new("http://a", "http://b");
        let orchestrator =
            RoundOrchestrator::new(&gateway, &TracingReporter, &participants, DEFAULT_CHOICE_RETRIES);
        orchestrator.run_round(2, None).await.expect("round");

        let prompts = prompts.lock().expect("lock");
        // 2 opening + 2 last + 2 choices
        assert_eq!(prompts.len(), 6);
        assert!(prompts[0].starts_with(SCENARIO));
        assert!(prompts[1].starts_with(SCENARIO));
    }

    #[tokio::test]
    async fn test_long_replies_are_narrated_in_full() {
        let long_reply = "We should both stay quiet. ".repeat(40);
        let reply = long_reply.clone();

        let mut gateway = MockParticipantGateway::new();
        gateway.expect_send().returning(move |prompt, _, _| {
            if prompt == CHOICE_PROMPT {
                Ok("silence".to_string())
            } else {
                Ok(reply.clone())
            }
        });

        let participants = Participants::new("http://a", "http://b");
        let reporter = RecordingReporter::default();
        RoundOrchestrator::new(&gateway, &reporter, &participants, DEFAULT_CHOICE_RETRIES)
            .run_round(2, None)
            .await
            .expect("round");

        let lines = reporter.lines.lock().expect("lock");
        assert!(long_reply.chars().count() > LOG_LIMIT);
        assert_eq!(lines[0], format!("a: {}", long_reply));
        assert_eq!(lines[1], format!("b: {}", long_reply));
    }
}
