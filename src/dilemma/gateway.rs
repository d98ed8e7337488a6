//! Seams between the match logic and the outside world.

use crate::error::Result;
use async_trait::async_trait;

/// Request/response channel to a remote prisoner.
///
/// Implementations own whatever conversation state they need per
/// participant; `reset` drops all of it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipantGateway: Send + Sync {
    /// Send `prompt` to the participant at `participant` and wait for its reply.
    async fn send(&self, prompt: &str, participant: &str, new_conversation: bool)
        -> Result<String>;

    /// Forget every conversation. Idempotent.
    async fn reset(&self);
}

/// Sink for human-readable progress narration.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, text: &str);

    /// True once whoever is watching has abandoned the match.
    async fn is_cancelled(&self) -> bool {
        false
    }
}

/// Reporter that narrates into the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

#[async_trait]
impl ProgressReporter for TracingReporter {
    async fn report(&self, text: &str) {
        tracing::info!(target: "prisoners::progress", "{}", text);
    }
}
