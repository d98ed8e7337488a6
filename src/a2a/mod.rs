//! A2A (Agent-to-Agent) protocol plumbing.
//!
//! - Agent Card discovery (`.well-known/agent.json`)
//! - JSON-RPC 2.0 task API (`message/send`, `tasks/get`, `tasks/cancel`)
//! - HTTP gateway server (axum) and the outbound client the guard uses
//!   to talk to prisoners

pub mod agent_card;
pub mod client;
pub mod executor;
pub mod handler;
pub mod server;
pub mod types;
