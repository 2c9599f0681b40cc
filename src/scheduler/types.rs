use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Zero-argument asynchronous callback run when a task fires.
pub type TaskAction = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// `Armed -> Firing -> (Armed | Disposed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Armed,
    Firing,
    Disposed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledTaskSnapshot {
    pub id: String,
    pub label: Option<String>,
    pub recurring: bool,
    pub delay: Duration,
    pub state: TaskState,
    pub fire_count: u64,
    pub failure_count: u64,
    /// Most recent failure, kept until a later failure replaces it.
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_fired_at: Option<DateTime<Utc>>,
}

impl ScheduledTaskSnapshot {
    pub(super) fn armed(id: String, label: Option<String>, delay: Duration, recurring: bool) -> Self {
        Self {
            id,
            label,
            recurring,
            delay,
            state: TaskState::Armed,
            fire_count: 0,
            failure_count: 0,
            last_error: None,
            created_at: Utc::now(),
            last_fired_at: None,
        }
    }
}
