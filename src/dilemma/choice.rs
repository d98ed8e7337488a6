//! Choices, reply parsing and the payoff matrix.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Choice ──────────────────────────────────────────────────

/// A prisoner's decision for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    /// Testify against the other prisoner.
    Testify,
    /// Stay silent.
    Silence,
    /// No clear answer after every retry. Scored as silence.
    Unrecognised,
}

impl Choice {
    pub const ALL: [Choice; 3] = [Choice::Testify, Choice::Silence, Choice::Unrecognised];

    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::Testify => "testify",
            Choice::Silence => "silence",
            Choice::Unrecognised => "unrecognised",
        }
    }

    /// The choice as the payoff matrix sees it.
    fn as_played(self) -> Choice {
        match self {
            Choice::Unrecognised => Choice::Silence,
            other => other,
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a free-form reply to a choice.
///
/// Only an exact, case-insensitive `testify` or `silence` (surrounding
/// whitespace ignored) is recognised.
pub fn parse_choice(reply: &str) -> Choice {
    let reply = reply.trim();
    if reply.eq_ignore_ascii_case("testify") {
        Choice::Testify
    } else if reply.eq_ignore_ascii_case("silence") {
        Choice::Silence
    } else {
        Choice::Unrecognised
    }
}

// ─── Payoff Matrix ───────────────────────────────────────────

/// Years served when both stay silent.
pub const BOTH_SILENT_YEARS: u32 = 1;
/// Years served when both testify.
pub const BOTH_TESTIFY_YEARS: u32 = 2;
/// Years served by the silent prisoner when the other testifies.
pub const BETRAYED_YEARS: u32 = 3;
/// Years served by the prisoner who testifies against a silent friend.
pub const BETRAYER_YEARS: u32 = 0;

/// Years served by `(a, b)` for a pair of choices. Lower is better.
pub fn score_round(a: Choice, b: Choice) -> (u32, u32) {
    match (a.as_played(), b.as_played()) {
        (Choice::Testify, Choice::Testify) => (BOTH_TESTIFY_YEARS, BOTH_TESTIFY_YEARS),
        (Choice::Testify, _) => (BETRAYER_YEARS, BETRAYED_YEARS),
        (_, Choice::Testify) => (BETRAYED_YEARS, BETRAYER_YEARS),
        _ => (BOTH_SILENT_YEARS, BOTH_SILENT_YEARS),
    }
}
