use super::{AgentRegistry, catalog_json, complete_or_cancel};
use crate::llm::{ChatClient, ChatMessage, ChatRequest, ChatResponse};
use crate::planner::extract_json;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_ROUTER_PROMPT: &str = "\
You route a user's conversation to exactly one agent.

Available agents and their capabilities:

{{agents}}

User's conversation:

{{messages}}

Respond with a JSON object of the form {\"agent\": \"<agent name>\"} naming the single
best agent for the latest user message.";

#[derive(Deserialize)]
struct RouteDecision {
    agent: String,
}

/// Picks one agent per request by asking the model, then delegates to it.
///
/// An unparseable decision or an unknown agent name yields an empty response.
pub struct AgentRouter {
    client: Arc<dyn ChatClient>,
    registry: Arc<AgentRegistry>,
    prompt: String,
}

impl AgentRouter {
    pub fn new(client: Arc<dyn ChatClient>, registry: Arc<AgentRegistry>) -> Self {
        Self {
            client,
            registry,
            prompt: DEFAULT_ROUTER_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    fn render_prompt(&self, history: &[ChatMessage]) -> anyhow::Result<String> {
        let messages = serde_json::to_string_pretty(history)?;
        Ok(self
            .prompt
            .replace("{{agents}}", &catalog_json(&self.registry.catalog()))
            .replace("{{messages}}", &messages))
    }

    /// Name of the agent the model picked, if it produced a usable decision.
    pub async fn route(
        &self,
        history: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<String>> {
        let request = ChatRequest::new(Some(self.render_prompt(history)?), Vec::new());
        let reply = complete_or_cancel(self.client.as_ref(), request, cancel)
            .await?
            .text();

        let decision = extract_json(&reply)
            .and_then(|json| serde_json::from_str::<RouteDecision>(json).ok())
            .map(|decision| decision.agent);
        if decision.is_none() {
            tracing::debug!(reply = %reply, "router reply had no agent decision");
        }
        Ok(decision)
    }

    pub async fn respond(
        &self,
        history: &[ChatMessage],
        cancel: CancellationToken,
    ) -> anyhow::Result<ChatResponse> {
        let Some(name) = self.route(history, &cancel).await? else {
            return Ok(ChatResponse::default());
        };

        match self.registry.resolve(&name) {
            Some(agent) => {
                tracing::info!(agent = %name, "routing request");
                agent.respond(history, cancel).await
            }
            None => {
                tracing::warn!(agent = %name, "router picked an unknown agent");
                Ok(ChatResponse::default())
            }
        }
    }
}
