//! Agent executors and the task updater they report through.
//!
//! The JSON-RPC handler owns task bookkeeping; an [`AgentExecutor`] only
//! sees the incoming text and a [`TaskUpdater`] bound to the task it
//! created.

use crate::a2a::handler::TaskStore;
use crate::a2a::types::*;
use crate::dilemma::ProgressReporter;
use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// What the executor is asked to do.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub task_id: String,
    pub context_id: String,
    /// Text parts of the incoming message, joined by newlines.
    pub text: String,
}

/// The agent behind an A2A gateway.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Card advertised at `.well-known/agent.json`.
    fn agent_card(&self, base_url: &str) -> AgentCard;

    /// Handle a `message/send`.
    ///
    /// Returning a validation error rejects the task; long-running work
    /// should be spawned and reported through `updater`.
    async fn execute(&self, ctx: RequestContext, updater: TaskUpdater) -> Result<()>;
}

/// Writes status changes and artifacts for one task into the store.
///
/// Once the task is terminal (completed, canceled, failed, rejected) all
/// further updates are dropped.
#[derive(Clone)]
pub struct TaskUpdater {
    store: TaskStore,
    task_id: String,
    context_id: String,
}

impl TaskUpdater {
    pub fn new(store: TaskStore, task_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            store,
            task_id: task_id.into(),
            context_id: context_id.into(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Mark the task as working, with a progress message.
    pub async fn start_work(&self, text: &str) {
        self.set_status(TaskState::Working, Some(text)).await;
    }

    /// Attach a named text artifact.
    pub async fn add_artifact(&self, name: &str, text: impl Into<String>) {
        let artifact = Artifact {
            artifact_id: Uuid::new_v4().to_string(),
            name: Some(name.to_string()),
            parts: vec![Part::text(text)],
        };
        self.update(|task| task.artifacts.push(artifact)).await;
    }

    pub async fn complete(&self) {
        self.set_status(TaskState::Completed, None).await;
    }

    /// Complete the task with `text` as its final status message.
    pub async fn complete_with(&self, text: &str) {
        self.set_status(TaskState::Completed, Some(text)).await;
    }

    pub async fn fail(&self, text: &str) {
        self.set_status(TaskState::Failed, Some(text)).await;
    }

    pub async fn reject(&self, text: &str) {
        self.set_status(TaskState::Rejected, Some(text)).await;
    }

    async fn set_status(&self, state: TaskState, text: Option<&str>) {
        let message = text.map(|t| Message::agent_text(t, &self.context_id, &self.task_id));
        self.update(|task| {
            if let Some(msg) = &message {
                task.history.push(msg.clone());
            }
            task.status = TaskStatus {
                state,
                message,
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
            };
        })
        .await;
    }

    async fn update(&self, apply: impl FnOnce(&mut Task)) {
        let mut tasks = self.store.write().await;
        match tasks.get_mut(&self.task_id) {
            Some(task) if !task.status.state.is_terminal() => apply(task),
            Some(task) => {
                tracing::debug!(
                    task_id = %self.task_id,
                    state = ?task.status.state,
                    "Ignoring update to finished task"
                );
            }
            None => tracing::warn!(task_id = %self.task_id, "Update for unknown task"),
        }
    }
}

#[async_trait]
impl ProgressReporter for TaskUpdater {
    async fn report(&self, text: &str) {
        self.start_work(text).await;
    }

    async fn is_cancelled(&self) -> bool {
        self.store
            .read()
            .await
            .get(&self.task_id)
            .is_none_or(|task| task.status.state == TaskState::Canceled)
    }
}
