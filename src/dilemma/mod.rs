//! Iterated prisoner's dilemma between two remote agents.
//!
//! The guard lets the prisoners talk for a fixed number of turns each round,
//! then asks each for `testify` or `silence`, scores the pair with the payoff
//! matrix, and tells both what happened before the next round begins.

pub mod choice;
pub mod game;
pub mod gateway;
pub mod request;
pub mod round;

pub use choice::{Choice, parse_choice, score_round};
pub use game::{MatchController, MatchHistory, MatchResult, Winner};
pub use gateway::{ParticipantGateway, ProgressReporter, TracingReporter};
pub use request::{EvalRequest, MatchPlan, Participants, Seat};
pub use round::{RoundOrchestrator, RoundRecord, extract_choice};
