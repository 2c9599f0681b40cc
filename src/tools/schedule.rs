use super::traits::Tool;
use super::types::ToolResult;
use crate::error::OrchestrationError;
use crate::llm::{ChatClient, ChatMessage, ChatRequest};
use crate::notify::NotificationSink;
use crate::scheduler::{ScheduledTaskHandle, Scheduler, format_delay, parse_delay};
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use futures_util::future::BoxFuture;
use serde_json::{Value, json};
use std::sync::Arc;

/// Turns a prompt into a scheduler action: ask the model, publish the answer.
#[derive(Clone)]
pub struct DeferredPrompt {
    scheduler: Scheduler,
    client: Arc<dyn ChatClient>,
    sink: Arc<dyn NotificationSink>,
    system: Option<String>,
}

impl DeferredPrompt {
    pub fn new(
        scheduler: Scheduler,
        client: Arc<dyn ChatClient>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            scheduler,
            client,
            sink,
            system: None,
        }
    }

    pub fn with_system(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run `prompt` after `delay`, repeating when `recurring`.
    pub fn schedule_in(
        &self,
        prompt: &str,
        delay: TimeDelta,
        recurring: bool,
    ) -> crate::error::Result<ScheduledTaskHandle> {
        let handle =
            self.scheduler
                .schedule_labeled(prompt, self.action(prompt), delay, recurring)?;
        tracing::info!(
            task_id = %handle.id(),
            delay = %delay,
            recurring,
            prompt = %prompt,
            "prompt scheduled"
        );
        Ok(handle)
    }

    /// Run `prompt` once at `when`.
    pub fn schedule_at(
        &self,
        prompt: &str,
        when: DateTime<Utc>,
    ) -> crate::error::Result<ScheduledTaskHandle> {
        let handle =
            self.scheduler
                .schedule_at(Some(prompt.to_string()), self.action(prompt), when)?;
        tracing::info!(
            task_id = %handle.id(),
            when = %when.to_rfc3339(),
            prompt = %prompt,
            "prompt scheduled"
        );
        Ok(handle)
    }

    fn action(
        &self,
        prompt: &str,
    ) -> impl Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + use<> {
        let client = Arc::clone(&self.client);
        let sink = Arc::clone(&self.sink);
        let system = self.system.clone();
        let prompt = prompt.to_string();

        move || -> BoxFuture<'static, anyhow::Result<()>> {
            let client = Arc::clone(&client);
            let sink = Arc::clone(&sink);
            let request = ChatRequest::new(system.clone(), vec![ChatMessage::user(prompt.clone())]);
            Box::pin(async move {
                let response = client.complete(request).await?;
                sink.publish(response);
                Ok(())
            })
        }
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, OrchestrationError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| OrchestrationError::InvalidArgument(format!("missing '{key}' parameter")))
}

fn required_prompt(args: &Value) -> Result<&str, OrchestrationError> {
    let prompt = required_str(args, "prompt")?;
    if prompt.trim().is_empty() {
        return Err(OrchestrationError::InvalidArgument(
            "prompt must not be empty".into(),
        ));
    }
    Ok(prompt)
}

/// ISO 8601 with an offset, or without one as local time.
fn parse_date_time(raw: &str) -> Result<DateTime<Utc>, OrchestrationError> {
    let raw = raw.trim();
    let error = match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => return Ok(parsed.with_timezone(&Utc)),
        Err(error) => error,
    };
    let local = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest());
    local.map(|when| when.with_timezone(&Utc)).ok_or_else(|| {
        OrchestrationError::InvalidArgument(format!("date_time '{raw}' is not ISO 8601: {error}"))
    })
}

/// Current local date and time with offset.
pub struct GetDateTool;

impl Tool for GetDateTool {
    fn name(&self) -> &str {
        "get_date"
    }

    fn description(&self) -> &str {
        "Gets the current date time (with offset)."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn execute(&self, _args: Value) -> BoxFuture<'_, anyhow::Result<ToolResult>> {
        Box::pin(async { Ok(ToolResult::ok(Local::now().to_rfc3339())) })
    }
}

pub struct SchedulePromptTool {
    deferred: DeferredPrompt,
}

impl SchedulePromptTool {
    pub fn new(deferred: DeferredPrompt) -> Self {
        Self { deferred }
    }

    fn schedule(&self, args: &Value) -> Result<String, OrchestrationError> {
        let prompt = required_prompt(args)?;
        let raw = required_str(args, "date_time")?;
        let when = parse_date_time(raw)?;

        let handle = self.deferred.schedule_at(prompt, when)?;
        Ok(format!("Scheduled for {raw} as {}", handle.id()))
    }
}

impl Tool for SchedulePromptTool {
    fn name(&self) -> &str {
        "schedule_prompt"
    }

    fn description(&self) -> &str {
        "Schedules execution of a given prompt for some future time."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The prompt to execute at a future time."
                },
                "date_time": {
                    "type": "string",
                    "description": "The absolute time in the future when this prompt should be executed, in ISO 8601 format. Without an offset it is read as local time."
                }
            },
            "required": ["prompt", "date_time"]
        })
    }

    fn execute(&self, args: Value) -> BoxFuture<'_, anyhow::Result<ToolResult>> {
        Box::pin(async move {
            Ok(match self.schedule(&args) {
                Ok(output) => ToolResult::ok(output),
                Err(error) => ToolResult::failed(error.to_string()),
            })
        })
    }
}

pub struct ScheduleRelativeTimeTool {
    deferred: DeferredPrompt,
}

impl ScheduleRelativeTimeTool {
    pub fn new(deferred: DeferredPrompt) -> Self {
        Self { deferred }
    }

    fn schedule(&self, args: &Value) -> Result<String, OrchestrationError> {
        let prompt = required_prompt(args)?;
        let delay = parse_delay(required_str(args, "delay")?)?;
        let recurring = args.get("recurring").and_then(Value::as_bool).unwrap_or(false);

        let handle = self.deferred.schedule_in(prompt, delay, recurring)?;
        let every = delay.to_std().map(format_delay).unwrap_or_default();

        Ok(if recurring {
            format!("Scheduled every {every} as {}", handle.id())
        } else {
            format!("Scheduled in {every} as {}", handle.id())
        })
    }
}

impl Tool for ScheduleRelativeTimeTool {
    fn name(&self) -> &str {
        "schedule_relative_time"
    }

    fn description(&self) -> &str {
        "Schedules execution (optionally recurring) of a given prompt after a delay."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The prompt to execute at a future time."
                },
                "delay": {
                    "type": "string",
                    "description": "The delay to wait before the prompt is executed, formatted as HH:MM:SS with an optional D. day prefix."
                },
                "recurring": {
                    "type": "boolean",
                    "description": "Whether the prompt runs again after each delay has elapsed."
                }
            },
            "required": ["prompt", "delay"]
        })
    }

    fn execute(&self, args: Value) -> BoxFuture<'_, anyhow::Result<ToolResult>> {
        Box::pin(async move {
            Ok(match self.schedule(&args) {
                Ok(output) => ToolResult::ok(output),
                Err(error) => ToolResult::failed(error.to_string()),
            })
        })
    }
}
