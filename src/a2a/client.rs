//! A2A client: the guard's channel to remote prisoners.
//!
//! Each participant address is resolved to its JSON-RPC endpoint through its
//! agent card, and gets one A2A `contextId` so consecutive prompts land in the
//! same conversation on the prisoner's side.

use crate::a2a::types::*;
use crate::dilemma::ParticipantGateway;
use crate::error::{GuardError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Delay between `tasks/get` polls while a participant is still working.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// [`ParticipantGateway`] over A2A JSON-RPC `message/send`.
pub struct A2aGateway {
    http: reqwest::Client,
    /// Participant address → JSON-RPC endpoint.
    endpoints: Mutex<HashMap<String, String>>,
    /// Participant address → current conversation context.
    contexts: Mutex<HashMap<String, String>>,
    /// How long to keep polling a task that is still running.
    reply_timeout: Duration,
}

impl A2aGateway {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GuardError::transport("http client", e))?;
        Ok(Self::with_client(http).with_reply_timeout(timeout))
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            endpoints: Mutex::new(HashMap::new()),
            contexts: Mutex::new(HashMap::new()),
            reply_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// JSON-RPC endpoint for `participant`, from its agent card.
    async fn endpoint(&self, participant: &str) -> Result<String> {
        if let Some(url) = self.endpoints.lock().await.get(participant) {
            return Ok(url.clone());
        }

        let card_url = format!("{}/.well-known/agent.json", participant.trim_end_matches('/'));
        let card: AgentCard = self
            .http
            .get(&card_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GuardError::transport(participant, format!("agent card: {}", e)))?
            .json()
            .await
            .map_err(|e| GuardError::transport(participant, format!("agent card: {}", e)))?;

        let url = card
            .supported_interfaces
            .first()
            .map(|i| i.url.clone())
            .unwrap_or_else(|| participant.to_string());
        tracing::debug!(participant, endpoint = %url, agent = %card.name, "Resolved participant");

        self.endpoints
            .lock()
            .await
            .insert(participant.to_string(), url.clone());
        Ok(url)
    }

    /// One JSON-RPC round trip; returns the `result` member.
    async fn call(
        &self,
        participant: &str,
        endpoint: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = JsonRpcRequest::new(method, params);
        let response: JsonRpcResponse = self
            .http
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GuardError::transport(participant, e))?
            .json()
            .await
            .map_err(|e| GuardError::transport(participant, format!("decode response: {}", e)))?;

        if let Some(err) = response.error {
            return Err(GuardError::transport(
                participant,
                format!("JSON-RPC error {}: {}", err.code, err.message),
            ));
        }
        response
            .result
            .ok_or_else(|| GuardError::transport(participant, "JSON-RPC response without result"))
    }

    async fn context_id(&self, participant: &str, new_conversation: bool) -> String {
        let mut contexts = self.contexts.lock().await;
        if new_conversation {
            contexts.remove(participant);
        }
        contexts
            .entry(participant.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }
}

#[async_trait]
impl ParticipantGateway for A2aGateway {
    async fn send(&self, prompt: &str, participant: &str, new_conversation: bool) -> Result<String> {
        let endpoint = self.endpoint(participant).await?;
        let context_id = self.context_id(participant, new_conversation).await;

        let params = SendMessageParams {
            message: Message::user_text(prompt, &context_id),
            metadata: None,
        };
        let params = serde_json::to_value(&params)
            .map_err(|e| GuardError::transport(participant, format!("encode request: {}", e)))?;
        let mut result = self.call(participant, &endpoint, "message/send", params).await?;

        let started = tokio::time::Instant::now();
        let reply = loop {
            match read_result(result).map_err(|reason| GuardError::transport(participant, reason))? {
                TaskProgress::Done(reply) => break reply,
                TaskProgress::Pending { task_id, state } => {
                    if started.elapsed() >= self.reply_timeout {
                        return Err(GuardError::transport(
                            participant,
                            format!("task {} still {:?} after {:?}", task_id, state, self.reply_timeout),
                        ));
                    }
                    tracing::debug!(participant, task_id = %task_id, ?state, "Waiting for participant task");
                    tokio::time::sleep(POLL_INTERVAL).await;
                    result = self
                        .call(participant, &endpoint, "tasks/get", serde_json::json!({"id": task_id}))
                        .await?;
                }
            }
        };

        if let Some(remote_context) = reply.context_id {
            if remote_context != context_id {
                self.contexts
                    .lock()
                    .await
                    .insert(participant.to_string(), remote_context);
            }
        }

        Ok(reply.text)
    }

    async fn reset(&self) {
        self.contexts.lock().await.clear();
        self.endpoints.lock().await.clear();
        tracing::debug!("A2A gateway reset");
    }
}

#[derive(Debug)]
struct Reply {
    text: String,
    context_id: Option<String>,
}

/// Where a participant's task stands after a `message/send` or `tasks/get`.
#[derive(Debug)]
enum TaskProgress {
    Done(Reply),
    Pending { task_id: String, state: TaskState },
}

/// Classify a result: a Message or a finished Task is a reply, a
/// submitted or working Task has to be polled.
fn read_result(result: serde_json::Value) -> std::result::Result<TaskProgress, String> {
    let state = result
        .get("status")
        .and_then(|s| s.get("state"))
        .and_then(|s| serde_json::from_value::<TaskState>(s.clone()).ok());
    if let Some(state @ (TaskState::Submitted | TaskState::Working)) = state {
        let task_id = result
            .get("id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| format!("{:?} task without id", state))?
            .to_string();
        return Ok(TaskProgress::Pending { task_id, state });
    }
    reply_text(result).map(TaskProgress::Done)
}

/// Extract reply text from a Message or a settled Task.
fn reply_text(result: serde_json::Value) -> std::result::Result<Reply, String> {
    let is_message = result.get("kind").and_then(|k| k.as_str()) == Some("message")
        || (result.get("parts").is_some() && result.get("status").is_none());

    if is_message {
        let message: Message =
            serde_json::from_value(result).map_err(|e| format!("decode message: {}", e))?;
        return non_empty(message.text(), message.context_id);
    }

    let task: Task = serde_json::from_value(result).map_err(|e| format!("decode task: {}", e))?;
    if matches!(task.status.state, TaskState::Submitted | TaskState::Working) {
        return Err(format!("task {} is still {:?}", task.id, task.status.state));
    }
    if matches!(task.status.state, TaskState::Failed | TaskState::Rejected | TaskState::Canceled) {
        let detail = task
            .status
            .message
            .as_ref()
            .map(Message::text)
            .unwrap_or_default();
        return Err(format!("task {} {:?}: {}", task.id, task.status.state, detail));
    }

    let artifact_text = task
        .artifacts
        .iter()
        .map(|a| joined_text(&a.parts))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let text = if artifact_text.is_empty() {
        task.status
            .message
            .as_ref()
            .map(Message::text)
            .unwrap_or_default()
    } else {
        artifact_text
    };
    non_empty(text, task.context_id)
}

fn non_empty(text: String, context_id: Option<String>) -> std::result::Result<Reply, String> {
    if text.trim().is_empty() {
        return Err("empty reply".to_string());
    }
    Ok(Reply { text, context_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const CHOICE: &str = "Make your choice by responding with 'testify' or 'silence'";

    fn card_body(server_url: &str) -> String {
        serde_json::to_string(&crate::a2a::agent_card::prisoner_agent_card(
            server_url,
            "tester",
            "test prisoner",
        ))
        .expect("card json")
    }

    fn task_result(text: &str, context_id: &str) -> String {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {
                "id": "task-1",
                "contextId": context_id,
                "status": {"state": "completed"},
                "artifacts": [{"artifactId": "a1", "parts": [{"kind": "text", "text": text}]}],
                "history": []
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_send_resolves_card_and_reads_artifact() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let card = server
            .mock("GET", "/.well-known/agent.json")
            .with_header("content-type", "application/json")
            .with_body(card_body(&url))
            .expect(1)
            .create_async()
            .await;
        let rpc = server
            .mock("POST", "/a2a/v1")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "jsonrpc": "2.0",
                "method": "message/send",
                "params": {"message": {"role": "user"}}
            })))
            .with_header("content-type", "application/json")
            .with_body(task_result("silence", "ctx-remote"))
            .expect(2)
            .create_async()
            .await;

        let gateway = A2aGateway::new(Duration::from_secs(5)).expect("gateway");
        let reply = gateway.send("hello", &url, false).await.expect("reply");
        assert_eq!(reply, "silence");
        gateway.send("hello", &url, false).await.expect("reply");

        card.assert_async().await;
        rpc.assert_async().await;
        assert_eq!(
            gateway.contexts.lock().await.get(&url).map(String::as_str),
            Some("ctx-remote")
        );
    }

    #[tokio::test]
    async fn test_conversation_context_is_reused_until_reset() {
        let gateway = A2aGateway::new(Duration::from_secs(5)).expect("gateway");
        let first = gateway.context_id("http://a", false).await;
        assert_eq!(gateway.context_id("http://a", false).await, first);
        assert_ne!(gateway.context_id("http://b", false).await, first);

        let fresh = gateway.context_id("http://a", true).await;
        assert_ne!(fresh, first);

        gateway.reset().await;
        gateway.reset().await;
        assert!(gateway.contexts.lock().await.is_empty());
        assert_ne!(gateway.context_id("http://a", false).await, fresh);
    }

    #[tokio::test]
    async fn test_jsonrpc_error_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        server
            .mock("GET", "/.well-known/agent.json")
            .with_body(card_body(&url))
            .create_async()
            .await;
        server
            .mock("POST", "/a2a/v1")
            .with_body(
                serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": "1",
                    "error": {"code": -32603, "message": "model overloaded"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let gateway = A2aGateway::new(Duration::from_secs(5)).expect("gateway");
        let err = gateway.send("hi", &url, false).await.expect_err("rpc error");
        assert!(matches!(err, GuardError::Transport { .. }));
        assert!(err.to_string().contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_missing_agent_card_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/.well-known/agent.json")
            .with_status(404)
            .create_async()
            .await;

        let gateway = A2aGateway::new(Duration::from_secs(5)).expect("gateway");
        let err = gateway
            .send("hi", &server.url(), false)
            .await
            .expect_err("no card");
        assert!(err.to_string().contains("agent card"));
    }

    #[test]
    fn test_reply_text_from_message_result() {
        let reply = reply_text(serde_json::json!({
            "kind": "message",
            "role": "agent",
            "contextId": "c9",
            "parts": [{"kind": "text", "text": "testify"}]
        }))
        .expect("reply");
        assert_eq!(reply.text, "testify");
        assert_eq!(reply.context_id.as_deref(), Some("c9"));
    }

    #[test]
    fn test_reply_text_falls_back_to_status_message() {
        let reply = reply_text(serde_json::json!({
            "id": "t",
            "status": {
                "state": "completed",
                "message": {"role": "agent", "parts": [{"text": "Let's stay quiet."}]}
            }
        }))
        .expect("reply");
        assert_eq!(reply.text, "Let's stay quiet.");
    }

    fn working_task(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "contextId": "ctx-remote",
            "status": {
                "state": "working",
                "message": {
                    "role": "agent",
                    "parts": [{"text": "Task created. Processing: Make your choice by responding with 'testify' or 'silence'"}]
                }
            }
        })
    }

    #[test]
    fn test_unfinished_task_is_not_a_reply() {
        assert!(reply_text(working_task("t")).is_err());

        let progress = read_result(working_task("t-7")).expect("pending");
        assert!(matches!(
            progress,
            TaskProgress::Pending { ref task_id, state: TaskState::Working } if task_id == "t-7"
        ));
    }

    #[test]
    fn test_input_required_task_is_a_reply() {
        let progress = read_result(serde_json::json!({
            "id": "t",
            "status": {
                "state": "input-required",
                "message": {"role": "agent", "parts": [{"text": "What do you suggest?"}]}
            }
        }))
        .expect("reply");
        assert!(matches!(progress, TaskProgress::Done(ref r) if r.text == "What do you suggest?"));
    }

    #[tokio::test]
    async fn test_working_task_is_polled_until_done() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        server
            .mock("GET", "/.well-known/agent.json")
            .with_body(card_body(&url))
            .create_async()
            .await;
        let send = server
            .mock("POST", "/a2a/v1")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "message/send"})))
            .with_body(
                serde_json::json!({"jsonrpc": "2.0", "id": "1", "result": working_task("task-1")})
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let poll = server
            .mock("POST", "/a2a/v1")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "method": "tasks/get",
                "params": {"id": "task-1"}
            })))
            .with_body(task_result("testify", "ctx-remote"))
            .expect(1)
            .create_async()
            .await;

        let gateway = A2aGateway::new(Duration::from_secs(5)).expect("gateway");
        let reply = gateway.send(CHOICE, &url, false).await.expect("reply");
        assert_eq!(reply, "testify");

        send.assert_async().await;
        poll.assert_async().await;
    }

    #[tokio::test]
    async fn test_task_still_working_after_timeout_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        server
            .mock("GET", "/.well-known/agent.json")
            .with_body(card_body(&url))
            .create_async()
            .await;
        server
            .mock("POST", "/a2a/v1")
            .with_body(
                serde_json::json!({"jsonrpc": "2.0", "id": "1", "result": working_task("task-9")})
                    .to_string(),
            )
            .create_async()
            .await;

        let gateway = A2aGateway::new(Duration::from_secs(5))
            .expect("gateway")
            .with_reply_timeout(Duration::ZERO);
        let err = gateway.send(CHOICE, &url, false).await.expect_err("never finished");
        assert!(matches!(err, GuardError::Transport { .. }));
        assert!(err.to_string().contains("task-9 still Working"));
    }

    #[test]
    fn test_reply_text_rejects_failed_and_empty_tasks() {
        let failed = reply_text(serde_json::json!({
            "id": "t",
            "status": {
                "state": "failed",
                "message": {"role": "agent", "parts": [{"text": "boom"}]}
            }
        }));
        assert!(failed.expect_err("failed").contains("boom"));

        let empty = reply_text(serde_json::json!({
            "id": "t",
            "status": {"state": "completed"},
            "artifacts": []
        }));
        assert_eq!(empty.err().as_deref(), Some("empty reply"));
    }
}
