use super::types::{ChatMessage, ChatRequest, ChatResponse, MessageRole};
use futures_util::future::BoxFuture;

/// Render a role-labelled transcript of the text blocks in `messages`.
pub fn messages_to_text(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .filter_map(|msg| {
            let role_label = match msg.role {
                MessageRole::User => "User:",
                MessageRole::Assistant => "Assistant:",
                MessageRole::System => "System:",
            };
            let text = msg.text();
            if text.is_empty() {
                None
            } else {
                Some(format!("{role_label} {text}"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The model boundary. Concrete network providers live outside this crate;
/// agents, planners and fired deferred tasks only talk to this trait.
pub trait ChatClient: Send + Sync {
    /// Client identifier used in logs.
    fn name(&self) -> &str;

    fn complete(&self, request: ChatRequest) -> BoxFuture<'_, anyhow::Result<ChatResponse>>;
}
