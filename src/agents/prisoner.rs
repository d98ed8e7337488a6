//! Fixed-strategy prisoner agent.
//!
//! Answers choice prompts with its strategy's word and every other prompt
//! with a canned line. Handy as a baseline opponent and for local runs.

use crate::a2a::agent_card::prisoner_agent_card;
use crate::a2a::executor::{AgentExecutor, RequestContext, TaskUpdater};
use crate::a2a::types::AgentCard;
use crate::error::Result;
use async_trait::async_trait;
use clap::ValueEnum;

/// How a fixed prisoner plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Always testify against the other prisoner.
    Betray,
    /// Always stay silent.
    Cooperate,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Betray => "betrayer",
            Strategy::Cooperate => "cooperator",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Strategy::Betray => {
                "Participates in an iterated prisoner's dilemma by always betraying their counterpart"
            }
            Strategy::Cooperate => {
                "Participates in an iterated prisoner's dilemma by always staying silent"
            }
        }
    }

    pub fn choice_word(&self) -> &'static str {
        match self {
            Strategy::Betray => "testify",
            Strategy::Cooperate => "silence",
        }
    }

    fn small_talk(&self) -> &'static str {
        // The betrayer says the same thing; it just doesn't mean it.
        "Let's both stay silent, that way we each only serve a year."
    }

    /// Reply to a guard prompt.
    pub fn respond(&self, prompt: &str) -> &'static str {
        if prompt.contains("'testify' or 'silence'") {
            self.choice_word()
        } else {
            self.small_talk()
        }
    }
}

/// [`AgentExecutor`] for a fixed-strategy prisoner.
pub struct PrisonerExecutor {
    strategy: Strategy,
}

impl PrisonerExecutor {
    pub fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }
}

#[async_trait]
impl AgentExecutor for PrisonerExecutor {
    fn agent_card(&self, base_url: &str) -> AgentCard {
        prisoner_agent_card(base_url, self.strategy.name(), self.strategy.description())
    }

    async fn execute(&self, ctx: RequestContext, updater: TaskUpdater) -> Result<()> {
        let reply = self.strategy.respond(&ctx.text);
        tracing::debug!(
            strategy = self.strategy.name(),
            context_id = %ctx.context_id,
            reply,
            "Prisoner reply"
        );
        updater.add_artifact("response", reply).await;
        updater.complete_with(reply).await;
        Ok(())
    }
}
