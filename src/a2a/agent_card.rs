//! Agent Card generation for `.well-known/agent.json`.
//!
//! The guard advertises its match-moderation skill with a sample eval
//! request; prisoners advertise their fixed strategy.

use crate::a2a::types::*;

pub const GUARD_EXAMPLE_REQUEST: &str = r#"{
  "participants": {
    "a": "https://prisoner-a.example.com:443",
    "b": "https://prisoner-b.example.org:8443"
  },
  "config": {
    "num_conversations_rounds": 5,
    "num_rounds": 10
  }
}"#;

/// JSON-RPC endpoint for an agent served at `base_url`.
pub fn rpc_url(base_url: &str) -> String {
    format!("{}/a2a/v1", base_url.trim_end_matches('/'))
}

fn text_modes() -> Vec<String> {
    vec!["text/plain".to_string()]
}

fn card(name: &str, description: &str, base_url: &str, skills: Vec<AgentSkill>) -> AgentCard {
    AgentCard {
        name: name.to_string(),
        description: Some(description.to_string()),
        version: Some(crate::VERSION.to_string()),
        documentation_url: None,
        icon_url: None,
        supported_interfaces: vec![SupportedInterface {
            url: rpc_url(base_url),
            protocol_binding: "JSONRPC".to_string(),
            protocol_version: Some("1.0".to_string()),
        }],
        provider: Some(AgentProvider {
            organization: "Prisoners Contributors".to_string(),
            url: None,
        }),
        capabilities: Some(AgentCapabilities {
            streaming: false,
            push_notifications: false,
            state_transition_history: true,
        }),
        skills,
        default_input_modes: text_modes(),
        default_output_modes: text_modes(),
    }
}

/// Build the guard's Agent Card.
pub fn guard_agent_card(base_url: &str) -> AgentCard {
    card(
        "prison-guard",
        "Orchestrate an iterated prisoner's dilemma between two agents \
         who can converse before making their choice",
        base_url,
        vec![AgentSkill {
            id: "moderate_iterated_prisoners_dilemma".to_string(),
            name: "Orchestrates interactions between prisoners".to_string(),
            description: Some(
                "Orchestrate and score an iterated prisoner's dilemma between two agents."
                    .to_string(),
            ),
            tags: vec!["prisoners-dilemma".to_string()],
            examples: vec![GUARD_EXAMPLE_REQUEST.to_string()],
            input_modes: vec!["application/json".to_string()],
            output_modes: vec!["application/json".to_string()],
        }],
    )
}

/// Build a fixed-strategy prisoner's Agent Card.
pub fn prisoner_agent_card(base_url: &str, strategy_name: &str, description: &str) -> AgentCard {
    card(
        &format!("prisoners_dilemma_{}", strategy_name),
        description,
        base_url,
        vec![AgentSkill {
            id: "play_prisoners_dilemma".to_string(),
            name: "Plays the prisoner's dilemma".to_string(),
            description: Some(description.to_string()),
            tags: vec!["prisoners-dilemma".to_string(), strategy_name.to_string()],
            examples: vec![],
            input_modes: text_modes(),
            output_modes: text_modes(),
        }],
    )
}
