//! A2A Gateway HTTP server powered by axum.
//!
//! Serves:
//! - `GET  /.well-known/agent.json`  Agent Card discovery
//! - `POST /a2a/v1`  JSON-RPC 2.0 endpoint
//! - `GET  /a2a/health`  Health check

use crate::a2a::executor::AgentExecutor;
use crate::a2a::{handler, types::*};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared state for the A2A gateway.
#[derive(Clone)]
pub struct A2aState {
    pub task_store: handler::TaskStore,
    pub executor: Arc<dyn AgentExecutor>,
    /// Externally reachable base URL advertised in the agent card.
    pub base_url: String,
}

impl A2aState {
    pub fn new(executor: Arc<dyn AgentExecutor>, base_url: impl Into<String>) -> Self {
        Self {
            task_store: handler::new_task_store(),
            executor,
            base_url: base_url.into(),
        }
    }
}

/// Build the axum router for the A2A gateway.
pub fn build_router(state: A2aState) -> Router {
    Router::new()
        .route("/.well-known/agent.json", get(get_agent_card))
        .route("/a2a/v1", post(handle_jsonrpc))
        .route("/a2a/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A2A Gateway server configuration.
#[derive(Debug, Clone)]
pub struct GatewayParams {
    pub bind: String,
    pub port: u16,
    /// Overrides the advertised URL (e.g. behind a proxy).
    pub card_url: Option<String>,
}

impl GatewayParams {
    pub fn base_url(&self) -> String {
        self.card_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.bind, self.port))
    }
}

/// Start the A2A gateway server and serve until the listener fails.
pub async fn start_server(
    params: &GatewayParams,
    executor: Arc<dyn AgentExecutor>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", params.bind, params.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid gateway address: {}", e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, params.base_url(), executor).await
}

/// Serve the gateway on an already bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    base_url: String,
    executor: Arc<dyn AgentExecutor>,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let card = executor.agent_card(&base_url);

    tracing::info!("A2A Gateway '{}' starting on http://{}", card.name, addr);
    tracing::info!("   Agent Card: {}/.well-known/agent.json", base_url.trim_end_matches('/'));
    tracing::info!("   JSON-RPC:   {}", crate::a2a::agent_card::rpc_url(&base_url));

    let app = build_router(A2aState::new(executor, base_url));
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /.well-known/agent.json: Agent Card discovery.
async fn get_agent_card(State(state): State<A2aState>) -> Json<AgentCard> {
    Json(state.executor.agent_card(&state.base_url))
}

/// POST /a2a/v1: JSON-RPC 2.0 endpoint.
async fn handle_jsonrpc(
    State(state): State<A2aState>,
    Json(req): Json<JsonRpcRequest>,
) -> (StatusCode, Json<JsonRpcResponse>) {
    if req.jsonrpc != "2.0" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::error(
                req.id,
                error_codes::INVALID_REQUEST,
                "Invalid JSON-RPC version, expected 2.0",
            )),
        );
    }

    let response = handler::dispatch(req, state.task_store, state.executor).await;
    (StatusCode::OK, Json(response))
}

/// GET /a2a/health: Health check.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "protocol": "A2A",
        "protocol_version": "1.0"
    }))
}
