//! Eval request intake and validation.
//!
//! An [`EvalRequest`] is the untrusted JSON a caller sends to the guard.
//! [`EvalRequest::validate`] turns it into a [`MatchPlan`]; nothing else
//! reaches the match controller.

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

pub const NUM_CONVERSATION_ROUNDS_KEY: &str = "num_conversations_rounds";
pub const NUM_ROUNDS_KEY: &str = "num_rounds";

/// The two seats at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    A,
    B,
}

impl Seat {
    pub const BOTH: [Seat; 2] = [Seat::A, Seat::B];

    /// Role name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Seat::A => "a",
            Seat::B => "b",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Seat::A => 0,
            Seat::B => 1,
        }
    }

    pub fn other(&self) -> Seat {
        match self {
            Seat::A => Seat::B,
            Seat::B => Seat::A,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw request: role → participant URL, plus loosely typed config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRequest {
    pub participants: HashMap<String, String>,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

/// Participant addresses by seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participants {
    a: String,
    b: String,
}

impl Participants {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn address(&self, seat: Seat) -> &str {
        match seat {
            Seat::A => &self.a,
            Seat::B => &self.b,
        }
    }
}

/// A validated request, ready to be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPlan {
    pub participants: Participants,
    pub num_rounds: usize,
    pub num_conversation_turns: usize,
}

impl EvalRequest {
    /// Parse the JSON text of an incoming message.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text.trim())
            .map_err(|e| GuardError::validation(format!("Invalid eval request: {}", e)))
    }

    /// Check roles, config keys and values.
    pub fn validate(&self) -> Result<MatchPlan> {
        let missing_roles = missing(Seat::BOTH.iter().map(Seat::as_str), |role| {
            self.participants.contains_key(role)
        });
        if !missing_roles.is_empty() {
            return Err(GuardError::validation(format!(
                "Missing roles: {}",
                missing_roles.join(", ")
            )));
        }

        let missing_keys = missing([NUM_CONVERSATION_ROUNDS_KEY, NUM_ROUNDS_KEY], |key| {
            self.config.contains_key(key)
        });
        if !missing_keys.is_empty() {
            return Err(GuardError::validation(format!(
                "Missing config keys: {}",
                missing_keys.join(", ")
            )));
        }

        let num_conversation_turns = self.count(NUM_CONVERSATION_ROUNDS_KEY, 2)?;
        let num_rounds = self.count(NUM_ROUNDS_KEY, 1)?;

        let a = self.address(Seat::A)?;
        let b = self.address(Seat::B)?;

        Ok(MatchPlan {
            participants: Participants::new(a, b),
            num_rounds,
            num_conversation_turns,
        })
    }

    fn count(&self, key: &str, minimum: usize) -> Result<usize> {
        let value = &self.config[key];
        let n = coerce_int(value).ok_or_else(|| {
            GuardError::validation(format!("Can't parse {}: {} is not an integer", key, value))
        })?;
        if n < minimum as i64 {
            return Err(GuardError::validation(format!(
                "{} must be at least {}, got {}",
                key, minimum, n
            )));
        }
        usize::try_from(n)
            .map_err(|_| GuardError::validation(format!("{} is out of range: {}", key, n)))
    }

    fn address(&self, seat: Seat) -> Result<String> {
        let raw = self.participants[seat.as_str()].trim();
        let url = reqwest::Url::parse(raw).map_err(|e| {
            GuardError::validation(format!("Invalid URL for role {}: {}", seat, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GuardError::validation(format!(
                "Invalid URL for role {}: unsupported scheme {}",
                seat,
                url.scheme()
            )));
        }
        Ok(raw.to_string())
    }
}

/// Names from `required` that fail `present`, sorted.
fn missing<'a>(
    required: impl IntoIterator<Item = &'a str>,
    present: impl Fn(&str) -> bool,
) -> Vec<&'a str> {
    required
        .into_iter()
        .filter(|name| !present(name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Integers, integral floats and numeric strings.
fn coerce_int(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
