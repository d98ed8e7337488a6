//! Agents served over A2A.

pub mod guard;
pub mod prisoner;

pub use guard::GuardExecutor;
pub use prisoner::{PrisonerExecutor, Strategy};
