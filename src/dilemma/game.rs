//! Match controller: plays every round in order and scores the match.

use crate::dilemma::choice::Choice;
use crate::dilemma::gateway::{ParticipantGateway, ProgressReporter};
use crate::dilemma::request::{MatchPlan, Seat};
use crate::dilemma::round::{DEFAULT_CHOICE_RETRIES, RoundOrchestrator, RoundRecord};
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ─── Results ─────────────────────────────────────────────────

/// Who served fewer years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    A,
    B,
    Draw,
}

impl Winner {
    /// Fewer years wins; equal totals draw.
    pub fn from_totals(a: u32, b: u32) -> Self {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Winner::A,
            std::cmp::Ordering::Greater => Winner::B,
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }
}

/// Total years served per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub a: u32,
    pub b: u32,
}

/// Every choice per role, in round order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Choices {
    pub a: Vec<Choice>,
    pub b: Vec<Choice>,
}

/// Final outcome of a match; the guard's `result` artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub winner: Winner,
    pub scores: Scores,
    pub choices: Choices,
}

// ─── History ─────────────────────────────────────────────────

/// Rounds played so far, in order.
#[derive(Debug, Clone, Default)]
pub struct MatchHistory {
    rounds: Vec<RoundRecord>,
}

impl MatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, record: RoundRecord) {
        self.rounds.push(record);
    }

    pub fn last(&self) -> Option<&RoundRecord> {
        self.rounds.last()
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn total(&self, seat: Seat) -> u32 {
        self.rounds.iter().map(|r| r.score(seat)).sum()
    }

    pub fn choices(&self, seat: Seat) -> Vec<Choice> {
        self.rounds.iter().map(|r| r.choice(seat)).collect()
    }

    /// Aggregate the history into the final result.
    pub fn result(&self) -> MatchResult {
        let scores = Scores {
            a: self.total(Seat::A),
            b: self.total(Seat::B),
        };
        MatchResult {
            winner: Winner::from_totals(scores.a, scores.b),
            scores,
            choices: Choices {
                a: self.choices(Seat::A),
                b: self.choices(Seat::B),
            },
        }
    }
}

// ─── Controller ──────────────────────────────────────────────

/// Runs whole matches through a gateway, narrating to a reporter.
pub struct MatchController {
    gateway: Arc<dyn ParticipantGateway>,
    reporter: Arc<dyn ProgressReporter>,
    choice_retries: u32,
}

impl MatchController {
    pub fn new(gateway: Arc<dyn ParticipantGateway>, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            gateway,
            reporter,
            choice_retries: DEFAULT_CHOICE_RETRIES,
        }
    }

    /// Re-prompt budget for unclear choices.
    pub fn with_choice_retries(mut self, retries: u32) -> Self {
        self.choice_retries = retries;
        self
    }

    /// Play `plan` to completion.
    ///
    /// The gateway is reset exactly once when the match ends, whether it
    /// finished or aborted on a transport failure.
    pub async fn run_match(&self, plan: &MatchPlan) -> Result<MatchResult> {
        let outcome = self.play(plan).await;
        self.gateway.reset().await;
        outcome
    }

    async fn play(&self, plan: &MatchPlan) -> Result<MatchResult> {
        tracing::info!(
            a = plan.participants.address(Seat::A),
            b = plan.participants.address(Seat::B),
            rounds = plan.num_rounds,
            turns = plan.num_conversation_turns,
            "Starting match"
        );

        let orchestrator = RoundOrchestrator::new(
            self.gateway.as_ref(),
            self.reporter.as_ref(),
            &plan.participants,
            self.choice_retries,
        );
        let mut history = MatchHistory::new();

        for i in 0..plan.num_rounds {
            if self.reporter.is_cancelled().await {
                tracing::info!(round = i, "Match cancelled, stopping");
                return Err(GuardError::Cancelled);
            }
            let start_msg = format!("Beginning round {} of {}", i, plan.num_rounds);
            tracing::info!("{}", start_msg);
            self.reporter.report(&start_msg).await;

            let [a, b] = orchestrator
                .run_round(plan.num_conversation_turns, history.last())
                .await?;
            let record = RoundRecord::new(a, b);
            tracing::info!(
                round = i,
                choice_a = %a,
                choice_b = %b,
                score_a = record.score(Seat::A),
                score_b = record.score(Seat::B),
                "Round complete"
            );
            history.push(record);
        }

        self.reporter
            .report("Rounds complete, aggregating scores")
            .await;
        let result = history.result();
        tracing::info!(
            winner = ?result.winner,
            score_a = result.scores.a,
            score_b = result.scores.b,
            "Match complete"
        );
        Ok(result)
    }
}
