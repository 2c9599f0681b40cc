use super::{Plan, PlanParser};
use crate::agents::{AgentDescriptor, catalog_json, complete_or_cancel};
use crate::llm::{ChatClient, ChatMessage, ChatRequest};
use anyhow::Context;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_COORDINATOR_PROMPT: &str = r#"You are a coordinator for an assistant that uses several agents to complete user-driven tasks.
Given the user's conversation and the agents available with their capabilities, create a plan
stating which agents to call and the dependencies between them.

Available agents and their capabilities:

{{agents}}

User's conversation:

{{messages}}

Based on the user's messages:
1. Identify the tasks needed to fulfil the request.
2. Map each task to the agent whose capabilities fit it.
3. Determine which tasks need the output of other tasks.

Respond with a plan in JSON format with the following structure:

{
  "steps": [
    { "id": "memory", "agent": "memory_retrieval" },
    { "id": "scheduler", "agent": "tasks_scheduler", "depends_on": ["memory"] },
    { "id": "email", "agent": "email_sender", "depends_on": ["memory", "scheduler"] },
    { "id": "persister", "agent": "memory_storage", "depends_on": ["memory"] }
  ]
}

Rules:
- Set "depends_on" whenever a step needs the output of earlier steps.
- Give every step a unique, readable id.
- List the steps in the order they should run.
- If no agent can handle a task, return a single step with the generic agent."#;

/// Produces a [`Plan`] for a conversation given the available agents.
pub trait Planner: Send + Sync {
    fn plan<'a>(
        &'a self,
        catalog: &'a [AgentDescriptor],
        history: &'a [ChatMessage],
        cancel: CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<Plan>>;
}

/// Asks the model for a plan and parses the JSON it returns.
pub struct ModelPlanner {
    client: Arc<dyn ChatClient>,
    prompt: String,
}

impl ModelPlanner {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self {
            client,
            prompt: DEFAULT_COORDINATOR_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    fn render_prompt(
        &self,
        catalog: &[AgentDescriptor],
        history: &[ChatMessage],
    ) -> anyhow::Result<String> {
        let messages = serde_json::to_string_pretty(history)?;
        Ok(self
            .prompt
            .replace("{{agents}}", &catalog_json(catalog))
            .replace("{{messages}}", &messages))
    }
}

impl Planner for ModelPlanner {
    fn plan<'a>(
        &'a self,
        catalog: &'a [AgentDescriptor],
        history: &'a [ChatMessage],
        cancel: CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<Plan>> {
        Box::pin(async move {
            let prompt = self.render_prompt(catalog, history)?;
            let request = ChatRequest::new(None, vec![ChatMessage::user(prompt)]);
            let reply = complete_or_cancel(self.client.as_ref(), request, &cancel)
                .await?
                .text();
            PlanParser::parse_reply(&reply).context("model returned an unusable plan")
        })
    }
}
