//! Prisoners: an A2A guard that runs iterated prisoner's dilemma matches
//! between two remote agents, plus fixed-strategy prisoners to play it.

pub mod a2a;
pub mod agents;
pub mod config;
pub mod dilemma;
pub mod error;
pub mod logging;
pub mod utils;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
