//! Error types for the guard, the A2A gateway client and configuration.

use thiserror::Error;

/// Errors surfaced by match orchestration and its collaborators.
///
/// An unrecognised choice is deliberately absent: it is a scored outcome,
/// not a failure.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Malformed eval request. Reported before any round runs.
    #[error("{0}")]
    Validation(String),

    /// A participant could not be reached or gave no usable reply.
    #[error("Transport failure talking to {participant}: {reason}")]
    Transport { participant: String, reason: String },

    /// The caller gave up on the match before it finished.
    #[error("Match cancelled")]
    Cancelled,

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl GuardError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn transport(participant: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            participant: participant.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;
