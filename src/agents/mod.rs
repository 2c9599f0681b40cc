//! Agents: named capability units that turn a message history into a response.
//!
//! Every agent is registered once at startup in an [`AgentRegistry`] and shared
//! read-only by the router, the coordinator and the plan executor.

use crate::llm::{ChatClient, ChatMessage, ChatRequest, ChatResponse};
use anyhow::bail;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub mod prompt;
pub mod registry;
pub mod router;
pub mod scheduling;

pub use prompt::PromptAgent;
pub use registry::AgentRegistry;
pub use router::AgentRouter;
pub use scheduling::{SCHEDULING_AGENT_NAME, SchedulingAgent};

/// Capability entry surfaced to planners and routers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub description: String,
}

pub trait Agent: Send + Sync {
    /// Stable routing key, unique within a registry. Case-sensitive.
    fn name(&self) -> &str;

    /// Capability text shown to the planner.
    fn description(&self) -> &str;

    /// Produce a response for `history`. Implementations should stop early
    /// when `cancel` fires; callers also race the future against it.
    fn respond<'a>(
        &'a self,
        history: &'a [ChatMessage],
        cancel: CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<ChatResponse>>;

    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Serialize a capability catalog the way prompts embed it.
pub fn catalog_json(catalog: &[AgentDescriptor]) -> String {
    serde_json::to_string_pretty(catalog).unwrap_or_else(|_| "[]".to_string())
}

/// Send `request` to `client`, giving up as soon as `cancel` fires.
pub(crate) async fn complete_or_cancel(
    client: &dyn ChatClient,
    request: ChatRequest,
    cancel: &CancellationToken,
) -> anyhow::Result<ChatResponse> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => bail!("request to '{}' cancelled", client.name()),
        response = client.complete(request) => response,
    }
}
