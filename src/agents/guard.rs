//! The guard: accepts eval requests over A2A and runs the match.
//!
//! Validation happens inline so a bad request is rejected in the
//! `message/send` response. Accepted matches run on a background task,
//! one at a time, narrating through the A2A task and finishing with a
//! `result` artifact.

use crate::a2a::agent_card::guard_agent_card;
use crate::a2a::executor::{AgentExecutor, RequestContext, TaskUpdater};
use crate::a2a::types::AgentCard;
use crate::dilemma::{EvalRequest, MatchController, MatchPlan, ParticipantGateway, ProgressReporter};
use crate::error::{GuardError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const RESULT_ARTIFACT: &str = "result";

/// [`AgentExecutor`] for the guard.
pub struct GuardExecutor {
    gateway: Arc<dyn ParticipantGateway>,
    choice_retries: u32,
    /// Held for the duration of a match; the gateway's conversation state
    /// belongs to one match at a time.
    match_lock: Arc<Mutex<()>>,
}

impl GuardExecutor {
    pub fn new(gateway: Arc<dyn ParticipantGateway>, choice_retries: u32) -> Self {
        Self {
            gateway,
            choice_retries,
            match_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run `plan` in the background, reporting through `updater`.
    pub fn spawn_match(&self, plan: MatchPlan, updater: TaskUpdater) -> JoinHandle<()> {
        let gateway = self.gateway.clone();
        let retries = self.choice_retries;
        let lock = self.match_lock.clone();

        tokio::spawn(async move {
            let _guard = lock.lock().await;
            let task_id = updater.task_id().to_string();
            let reporter: Arc<dyn ProgressReporter> = Arc::new(updater.clone());
            let controller = MatchController::new(gateway, reporter).with_choice_retries(retries);

            match controller.run_match(&plan).await {
                Ok(result) => match serde_json::to_string(&result) {
                    Ok(json) => {
                        tracing::info!(task_id = %task_id, "Final scores: {}", json);
                        updater.add_artifact(RESULT_ARTIFACT, json).await;
                        updater.complete().await;
                    }
                    Err(e) => updater.fail(&format!("Failed to encode result: {}", e)).await,
                },
                Err(GuardError::Cancelled) => {
                    tracing::info!(task_id = %task_id, "Match abandoned after cancel");
                }
                Err(e) => {
                    tracing::error!(task_id = %task_id, "Match aborted: {}", e);
                    updater.fail(&e.to_string()).await;
                }
            }
        })
    }
}

#[async_trait]
impl AgentExecutor for GuardExecutor {
    fn agent_card(&self, base_url: &str) -> AgentCard {
        guard_agent_card(base_url)
    }

    async fn execute(&self, ctx: RequestContext, updater: TaskUpdater) -> Result<()> {
        let plan = EvalRequest::from_json(&ctx.text)?.validate()?;
        tracing::info!(task_id = %ctx.task_id, "Starting orchestration: {:?}", plan);
        updater
            .start_work(&format!(
                "Accepted match: {} rounds of {} conversation turns",
                plan.num_rounds, plan.num_conversation_turns
            ))
            .await;
        self.spawn_match(plan, updater);
        Ok(())
    }
}
