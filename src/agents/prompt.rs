use super::{Agent, AgentDescriptor, catalog_json, complete_or_cancel};
use crate::llm::{ChatClient, ChatMessage, ChatRequest, ChatResponse};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const AGENTS_PLACEHOLDER: &str = "{agents}";

/// Configuration-driven agent: a name, a description and an optional system
/// prompt in front of a chat client.
///
/// The prompt may reference `{agents}`, which is replaced by the JSON
/// capability catalog handed to [`PromptAgent::with_catalog`].
pub struct PromptAgent {
    name: String,
    description: String,
    prompt: Option<String>,
    client: Arc<dyn ChatClient>,
}

impl PromptAgent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        client: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            prompt: None,
            client,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Resolve the `{agents}` placeholder once, at registration time.
    pub fn with_catalog(mut self, catalog: &[AgentDescriptor]) -> Self {
        if let Some(prompt) = self.prompt.as_mut()
            && prompt.contains(AGENTS_PLACEHOLDER)
        {
            *prompt = prompt.replace(AGENTS_PLACEHOLDER, &catalog_json(catalog));
        }
        self
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }
}

impl Agent for PromptAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn respond<'a>(
        &'a self,
        history: &'a [ChatMessage],
        cancel: CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<ChatResponse>> {
        Box::pin(async move {
            let request = ChatRequest::new(self.prompt.clone(), history.to_vec());
            complete_or_cancel(self.client.as_ref(), request, &cancel).await
        })
    }
}
