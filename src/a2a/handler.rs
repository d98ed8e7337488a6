//! JSON-RPC 2.0 handler for A2A protocol operations.
//!
//! Dispatches JSON-RPC methods:
//! - `message/send` → create task + hand the message to the agent executor
//! - `tasks/get`    → retrieve task by ID
//! - `tasks/cancel` → cancel a running task

use crate::a2a::executor::{AgentExecutor, RequestContext, TaskUpdater};
use crate::a2a::types::*;
use crate::utils::truncate_str;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory task store.
pub type TaskStore = Arc<RwLock<HashMap<String, Task>>>;

/// Create a new empty task store.
pub fn new_task_store() -> TaskStore {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Dispatch a JSON-RPC request to the appropriate handler.
pub async fn dispatch(
    req: JsonRpcRequest,
    store: TaskStore,
    executor: Arc<dyn AgentExecutor>,
) -> JsonRpcResponse {
    match req.method.as_str() {
        "message/send" => handle_send_message(req.id, req.params, store, executor).await,
        "tasks/get" => handle_get_task(req.id, req.params, store).await,
        "tasks/cancel" => handle_cancel_task(req.id, req.params, store).await,
        _ => JsonRpcResponse::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    }
}

/// Handle `message/send`: create a task and run the executor on it.
async fn handle_send_message(
    id: serde_json::Value,
    params: serde_json::Value,
    store: TaskStore,
    executor: Arc<dyn AgentExecutor>,
) -> JsonRpcResponse {
    let send_params: SendMessageParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => {
            return JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            );
        }
    };

    let user_text = send_params.message.text();

    let task_id = Uuid::new_v4().to_string();
    let context_id = send_params
        .message
        .context_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let task = Task {
        id: task_id.clone(),
        context_id: Some(context_id.clone()),
        status: TaskStatus {
            state: TaskState::Working,
            message: Some(Message::agent_text(
                format!("Task created. Processing: {}", truncate_str(&user_text, 100)),
                &context_id,
                &task_id,
            )),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        },
        artifacts: vec![],
        history: vec![send_params.message],
        metadata: None,
    };

    {
        let mut tasks = store.write().await;
        tasks.insert(task_id.clone(), task);
    }

    tracing::info!(
        task_id = %task_id,
        context_id = %context_id,
        "A2A: Created task for message: {}",
        truncate_str(&user_text, 200)
    );

    let updater = TaskUpdater::new(store.clone(), task_id.clone(), context_id.clone());
    let ctx = RequestContext {
        task_id: task_id.clone(),
        context_id,
        text: user_text,
    };

    if let Err(e) = executor.execute(ctx, updater.clone()).await {
        let reason = e.to_string();
        let code = if e.is_validation() {
            tracing::warn!(task_id = %task_id, "A2A: Rejected task: {}", reason);
            updater.reject(&reason).await;
            error_codes::INVALID_PARAMS
        } else {
            tracing::error!(task_id = %task_id, "A2A: Task failed: {}", reason);
            updater.fail(&reason).await;
            error_codes::INTERNAL_ERROR
        };
        return JsonRpcResponse::error(id, code, reason);
    }

    let tasks = store.read().await;
    match tasks.get(&task_id) {
        Some(task) => {
            let task_json = serde_json::to_value(task)
                .unwrap_or_else(|_| serde_json::json!({"error": "serialize"}));
            JsonRpcResponse::success(id, task_json)
        }
        None => JsonRpcResponse::error(
            id,
            error_codes::TASK_NOT_FOUND,
            format!("Task not found: {}", task_id),
        ),
    }
}

/// Handle `tasks/get`: retrieve a task by ID.
async fn handle_get_task(
    id: serde_json::Value,
    params: serde_json::Value,
    store: TaskStore,
) -> JsonRpcResponse {
    let get_params: GetTaskParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => {
            return JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            );
        }
    };

    let tasks = store.read().await;
    match tasks.get(&get_params.id) {
        Some(task) => {
            let task_json = serde_json::to_value(task)
                .unwrap_or_else(|_| serde_json::json!({"error": "serialize"}));
            JsonRpcResponse::success(id, task_json)
        }
        None => JsonRpcResponse::error(
            id,
            error_codes::TASK_NOT_FOUND,
            format!("Task not found: {}", get_params.id),
        ),
    }
}

/// Handle `tasks/cancel`: cancel a running task.
///
/// Spawned work sees the cancel through its updater and stops at its next
/// check; until then its updates are dropped.
async fn handle_cancel_task(
    id: serde_json::Value,
    params: serde_json::Value,
    store: TaskStore,
) -> JsonRpcResponse {
    let cancel_params: CancelTaskParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => {
            return JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            );
        }
    };

    let mut tasks = store.write().await;
    match tasks.get_mut(&cancel_params.id) {
        Some(task) => {
            if task.status.state.is_terminal() {
                return JsonRpcResponse::error(
                    id,
                    error_codes::UNSUPPORTED_OPERATION,
                    format!("Cannot cancel task in {:?} state", task.status.state),
                );
            }
            task.status.state = TaskState::Canceled;
            task.status.timestamp = Some(chrono::Utc::now().to_rfc3339());
            tracing::info!("A2A: Canceled task {}", cancel_params.id);
            let task_json = serde_json::to_value(&*task)
                .unwrap_or_else(|_| serde_json::json!({"error": "serialize"}));
            JsonRpcResponse::success(id, task_json)
        }
        None => JsonRpcResponse::error(
            id,
            error_codes::TASK_NOT_FOUND,
            format!("Task not found: {}", cancel_params.id),
        ),
    }
}
