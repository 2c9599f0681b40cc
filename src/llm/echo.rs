use super::traits::ChatClient;
use super::types::{ChatRequest, ChatResponse, MessageRole};
use futures_util::future::BoxFuture;

/// Offline client that answers with the last text it was sent, prefixed
/// by its label. Used by the CLI when no provider is wired in.
pub struct EchoClient {
    label: String,
}

impl EchoClient {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    fn reply_to(&self, request: &ChatRequest) -> String {
        let last = request
            .messages
            .iter()
            .rev()
            .find(|message| message.role != MessageRole::System)
            .map(crate::llm::ChatMessage::text)
            .filter(|text| !text.is_empty());

        match last {
            Some(text) => format!("{}: {text}", self.label),
            None => format!("{}: (no input)", self.label),
        }
    }
}

impl ChatClient for EchoClient {
    fn name(&self) -> &str {
        "echo"
    }

    fn complete(&self, request: ChatRequest) -> BoxFuture<'_, anyhow::Result<ChatResponse>> {
        Box::pin(async move { Ok(ChatResponse::text_only(self.reply_to(&request))) })
    }
}
