//! Scripted participant gateway shared by the match tests.

use crate::dilemma::ParticipantGateway;
use crate::dilemma::round::{CHOICE_PROMPT, RETRY_PROMPT};
use crate::error::{GuardError, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One call seen by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub participant: String,
    pub prompt: String,
    pub new_conversation: bool,
}

/// Answers choice prompts with a fixed word per participant (`a` is the
/// address containing "prisoner-a" or equal to "http://a") and chats
/// otherwise.
pub struct ScriptedGateway {
    choice_a: String,
    choice_b: String,
    fail_after: Option<(usize, String)>,
    calls: Mutex<Vec<Call>>,
    resets: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(choice_a: &str, choice_b: &str) -> Self {
        Self {
            choice_a: choice_a.to_string(),
            choice_b: choice_b.to_string(),
            fail_after: None,
            calls: Mutex::new(Vec::new()),
            resets: AtomicUsize::new(0),
        }
    }

    /// Succeed for `calls` sends, then fail every send with `reason`.
    pub fn failing_after(mut self, calls: usize, reason: &str) -> Self {
        self.fail_after = Some((calls, reason.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    fn is_a(participant: &str) -> bool {
        participant.contains("prisoner-a") || participant == "http://a"
    }
}

#[async_trait]
impl ParticipantGateway for ScriptedGateway {
    async fn send(&self, prompt: &str, participant: &str, new_conversation: bool) -> Result<String> {
        let seen = {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.push(Call {
                participant: participant.to_string(),
                prompt: prompt.to_string(),
                new_conversation,
            });
            calls.len()
        };

        if let Some((limit, reason)) = &self.fail_after {
            if seen > *limit {
                return Err(GuardError::transport(participant, reason));
            }
        }

        if prompt == CHOICE_PROMPT || prompt == RETRY_PROMPT {
            let choice = if Self::is_a(participant) {
                &self.choice_a
            } else {
                &self.choice_b
            };
            return Ok(choice.clone());
        }
        Ok(format!("message {} from {}", seen, participant))
    }

    async fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}
