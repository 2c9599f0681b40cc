use super::{PlanExecutor, Planner};
use crate::agents::{Agent, AgentRegistry};
use crate::llm::{ChatMessage, ChatResponse};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const COORDINATOR_AGENT_NAME: &str = "coordinator";

/// Plans a multi-agent answer for a conversation and executes the plan.
pub struct AgentCoordinator {
    planner: Arc<dyn Planner>,
    executor: PlanExecutor,
}

impl AgentCoordinator {
    pub fn new(planner: Arc<dyn Planner>, executor: PlanExecutor) -> Self {
        Self { planner, executor }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        self.executor.registry()
    }

    pub async fn respond(
        &self,
        history: &[ChatMessage],
        cancel: CancellationToken,
    ) -> anyhow::Result<ChatResponse> {
        let catalog = self.registry().catalog();
        let plan = self.planner.plan(&catalog, history, cancel.clone()).await?;

        if tracing::enabled!(tracing::Level::TRACE) {
            let rendered = serde_json::to_string_pretty(&plan)?;
            tracing::trace!(plan = %rendered, "execution plan");
        }

        Ok(self.executor.execute(&plan, history, &cancel).await?)
    }
}

impl Agent for AgentCoordinator {
    fn name(&self) -> &str {
        COORDINATOR_AGENT_NAME
    }

    fn description(&self) -> &str {
        "Breaks a request into steps handled by other agents and combines their answers."
    }

    fn respond<'a>(
        &'a self,
        history: &'a [ChatMessage],
        cancel: CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<ChatResponse>> {
        Box::pin(AgentCoordinator::respond(self, history, cancel))
    }
}
