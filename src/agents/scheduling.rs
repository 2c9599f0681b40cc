use super::{Agent, complete_or_cancel};
use crate::llm::{ChatClient, ChatMessage, ChatRequest, ChatResponse, ContentBlock, MessageRole};
use crate::notify::NotificationSink;
use crate::scheduler::Scheduler;
use crate::tools::{
    DeferredPrompt, GetDateTool, SchedulePromptTool, ScheduleRelativeTimeTool, ToolRegistry,
};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const SCHEDULING_AGENT_NAME: &str = "tasks_scheduler";

const DEFAULT_DESCRIPTION: &str =
    "Schedules prompts to run at an absolute time or after a delay, optionally recurring.";

const DEFAULT_PROMPT: &str = "\
You schedule work for later. Use get_date to learn the current time, schedule_prompt for an \
absolute time and schedule_relative_time for a delay. Confirm briefly what was scheduled.";

/// Agent that turns requests such as "remind me in ten minutes" into
/// scheduled prompts whose answers are published to a notification sink.
///
/// Each request costs two model calls: one offering the scheduling tools and a
/// transcript of the conversation, then one for the conversational reply.
pub struct SchedulingAgent {
    name: String,
    description: String,
    prompt: String,
    client: Arc<dyn ChatClient>,
    tools: ToolRegistry,
}

impl SchedulingAgent {
    pub fn new(
        client: Arc<dyn ChatClient>,
        scheduler: Scheduler,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_prompt(client, scheduler, sink, DEFAULT_PROMPT)
    }

    pub fn with_prompt(
        client: Arc<dyn ChatClient>,
        scheduler: Scheduler,
        sink: Arc<dyn NotificationSink>,
        prompt: impl Into<String>,
    ) -> Self {
        let prompt = prompt.into();
        let deferred = DeferredPrompt::new(scheduler, Arc::clone(&client), sink)
            .with_system(Some(prompt.clone()));

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(GetDateTool));
        tools.register(Arc::new(SchedulePromptTool::new(deferred.clone())));
        tools.register(Arc::new(ScheduleRelativeTimeTool::new(deferred)));

        Self {
            name: SCHEDULING_AGENT_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            prompt,
            client,
            tools,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    fn scheduling_request(&self, history: &[ChatMessage]) -> anyhow::Result<ChatRequest> {
        let transcript = serde_json::to_string_pretty(history)?;
        let instruction = format!(
            "Given the following user conversation:\n{transcript}\n\n\
             Invoke the relevant tools to schedule a prompt for execution at the relevant time."
        );
        Ok(
            ChatRequest::new(Some(self.prompt.clone()), vec![ChatMessage::user(instruction)])
                .with_tools(self.tools.specs()),
        )
    }

    /// Execute every tool call in `response`, returning the tool results as a
    /// single user message, or `None` when the model asked for nothing.
    async fn run_tool_calls(&self, response: &ChatResponse) -> Option<ChatMessage> {
        let calls = response.tool_uses();
        if calls.is_empty() {
            return None;
        }

        let mut results = Vec::with_capacity(calls.len());
        for (id, name, input) in calls {
            let (content, is_error) = match self.tools.execute(name, input.clone()).await {
                Ok(result) if result.success => (result.output, false),
                Ok(result) => (result.error.unwrap_or_default(), true),
                Err(error) => (format!("{error:#}"), true),
            };
            if is_error {
                tracing::warn!(tool = %name, error = %content, "scheduling tool failed");
            }
            results.push(ContentBlock::ToolResult {
                tool_use_id: id.to_string(),
                content,
                is_error,
            });
        }

        Some(ChatMessage {
            role: MessageRole::User,
            content: results,
        })
    }
}

impl Agent for SchedulingAgent {
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
            let request = self.scheduling_request(history)?;
            let planned = complete_or_cancel(self.client.as_ref(), request, &cancel).await?;

            let mut messages = history.to_vec();
            if let Some(results) = self.run_tool_calls(&planned).await {
                messages.extend(planned.messages);
                messages.push(results);
            }

            let reply = ChatRequest::new(Some(self.prompt.clone()), messages);
            complete_or_cancel(self.client.as_ref(), reply, &cancel).await
        })
    }
}
