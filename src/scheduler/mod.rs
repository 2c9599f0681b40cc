//! Deferred task scheduler.
//!
//! Every scheduled task gets its own background loop on the tokio runtime:
//! sleep for `delay`, run the action to completion, then either re-arm
//! (recurring) or dispose itself (one-shot). The loop owns a cancellation
//! token derived from the scheduler's shutdown token, so a task never
//! overlaps its own next firing and can be stopped without touching the
//! timer from inside its own callback.
//!
//! Failures inside a fired action (errors and panics alike) are logged and
//! recorded on the task's snapshot; they never reach the caller that
//! scheduled the task and never stop a recurring task.

use crate::config::SchedulerConfig;
use crate::error::{OrchestrationError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

mod delay;
mod types;

pub use delay::{format_delay, parse_delay};
pub use types::{ScheduledTaskSnapshot, TaskAction, TaskState};

struct TaskEntry {
    seq: u64,
    snapshot: ScheduledTaskSnapshot,
    cancel: CancellationToken,
}

struct SchedulerInner {
    tasks: Mutex<HashMap<String, TaskEntry>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    max_tasks: usize,
    next_seq: AtomicU64,
}

impl SchedulerInner {
    fn update(&self, id: &str, apply: impl FnOnce(&mut ScheduledTaskSnapshot)) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = tasks.get_mut(id) {
            apply(&mut entry.snapshot);
        }
    }

    fn dispose(&self, id: &str) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if tasks.remove(id).is_some() {
            tracing::debug!(task_id = %id, "task.disposed");
        }
    }
}

/// Process-wide registry of deferred tasks. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_max_tasks(0)
    }

    /// `max_tasks == 0` means no limit.
    pub fn with_max_tasks(max_tasks: usize) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                tasks: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
                max_tasks,
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::with_max_tasks(config.max_tasks)
    }

    /// Run `action` after `delay`, and again every `delay` if `recurring`.
    ///
    /// Fails with `InvalidArgument` for a negative delay, a full scheduler or
    /// a scheduler that was shut down. A zero delay is fine for a one-shot
    /// task, but a recurring task must have a positive delay: zero would
    /// re-fire in a tight loop, so it is rejected on purpose even though only
    /// negative delays are invalid in general.
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(
        &self,
        action: F,
        delay: TimeDelta,
        recurring: bool,
    ) -> Result<ScheduledTaskHandle>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(None, boxed_action(action), delay, recurring)
    }

    /// Same as [`Scheduler::schedule`], with a label shown in snapshots and logs.
    pub fn schedule_labeled<F, Fut>(
        &self,
        label: impl Into<String>,
        action: F,
        delay: TimeDelta,
        recurring: bool,
    ) -> Result<ScheduledTaskHandle>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(Some(label.into()), boxed_action(action), delay, recurring)
    }

    /// Run `action` once at `when`. Timestamps in the past are rejected.
    pub fn schedule_at<F, Fut>(
        &self,
        label: Option<String>,
        action: F,
        when: DateTime<Utc>,
    ) -> Result<ScheduledTaskHandle>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let delay = when - Utc::now();
        if delay < TimeDelta::zero() {
            return Err(OrchestrationError::InvalidArgument(format!(
                "scheduled time {} is in the past",
                when.to_rfc3339()
            )));
        }
        self.register(label, boxed_action(action), delay, false)
    }

    fn register(
        &self,
        label: Option<String>,
        action: TaskAction,
        delay: TimeDelta,
        recurring: bool,
    ) -> Result<ScheduledTaskHandle> {
        let delay = delay.to_std().map_err(|_| {
            OrchestrationError::InvalidArgument(format!(
                "delay must be zero or positive, got {delay}"
            ))
        })?;
        if recurring && delay.is_zero() {
            return Err(OrchestrationError::InvalidArgument(
                "recurring tasks require a positive delay".into(),
            ));
        }
        if self.inner.shutdown.is_cancelled() {
            return Err(OrchestrationError::InvalidArgument(
                "scheduler is shut down".into(),
            ));
        }

        let id = format!("task_{}", Uuid::new_v4().simple());
        let cancel = self.inner.shutdown.child_token();
        {
            let mut tasks = self
                .inner
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.inner.max_tasks > 0 && tasks.len() >= self.inner.max_tasks {
                return Err(OrchestrationError::InvalidArgument(format!(
                    "scheduler is at capacity ({} tasks)",
                    self.inner.max_tasks
                )));
            }
            tasks.insert(
                id.clone(),
                TaskEntry {
                    seq: self.inner.next_seq.fetch_add(1, Ordering::Relaxed),
                    snapshot: ScheduledTaskSnapshot::armed(
                        id.clone(),
                        label.clone(),
                        delay,
                        recurring,
                    ),
                    cancel: cancel.clone(),
                },
            );
        }

        tracing::info!(
            task_id = %id,
            label = label.as_deref().unwrap_or(""),
            delay = %format_delay(delay),
            recurring,
            "task.scheduled"
        );

        self.inner.tracker.spawn(run_task(
            Arc::clone(&self.inner),
            id.clone(),
            action,
            delay,
            recurring,
            cancel,
        ));

        Ok(ScheduledTaskHandle {
            id,
            scheduler: self.clone(),
        })
    }

    /// Number of tasks that are armed or firing.
    pub fn active_count(&self) -> usize {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn snapshot(&self, id: &str) -> Option<ScheduledTaskSnapshot> {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|entry| entry.snapshot.clone())
    }

    /// All active tasks, oldest first.
    pub fn list(&self) -> Vec<ScheduledTaskSnapshot> {
        let tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<&TaskEntry> = tasks.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries
            .into_iter()
            .map(|entry| entry.snapshot.clone())
            .collect()
    }

    /// Stop a task. An in-flight firing runs to completion; the task is
    /// disposed before it would be re-armed. Returns whether the task existed.
    pub fn cancel(&self, id: &str) -> bool {
        let tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = tasks.get(id) else {
            return false;
        };
        entry.cancel.cancel();
        tracing::info!(task_id = %id, "task.cancel_requested");
        true
    }

    /// Cancel every task, refuse new ones, and wait for in-flight firings.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        tracing::info!("scheduler.shutdown");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

/// Returned by every `schedule*` call. Dropping it leaves the task running.
#[derive(Clone)]
pub struct ScheduledTaskHandle {
    id: String,
    scheduler: Scheduler,
}

impl ScheduledTaskHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cancel(&self) -> bool {
        self.scheduler.cancel(&self.id)
    }

    pub fn state(&self) -> TaskState {
        self.snapshot()
            .map_or(TaskState::Disposed, |snapshot| snapshot.state)
    }

    pub fn snapshot(&self) -> Option<ScheduledTaskSnapshot> {
        self.scheduler.snapshot(&self.id)
    }
}

impl std::fmt::Debug for ScheduledTaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTaskHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

fn boxed_action<F, Fut>(action: F) -> TaskAction
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(action()))
}

async fn run_task(
    inner: Arc<SchedulerInner>,
    id: String,
    action: TaskAction,
    delay: Duration,
    recurring: bool,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(task_id = %id, "task.cancelled");
                break;
            }
            () = tokio::time::sleep(delay) => {}
        }

        inner.update(&id, |snapshot| snapshot.state = TaskState::Firing);
        let outcome = fire(&id, &action).await;
        inner.update(&id, |snapshot| {
            snapshot.fire_count += 1;
            snapshot.last_fired_at = Some(Utc::now());
            if let Err(error) = &outcome {
                snapshot.failure_count += 1;
                snapshot.last_error = Some(error.to_string());
            }
            snapshot.state = TaskState::Armed;
        });

        if !recurring {
            break;
        }
    }

    inner.dispose(&id);
}

/// Run one firing on its own task so a panicking action is contained.
async fn fire(id: &str, action: &TaskAction) -> Result<()> {
    match tokio::spawn(action()).await {
        Ok(Ok(())) => {
            tracing::debug!(task_id = %id, "task.fired");
            Ok(())
        }
        Ok(Err(error)) => {
            let message = format!("{error:#}");
            tracing::error!(task_id = %id, error = %message, "task.action_failed");
            Err(OrchestrationError::ScheduledAction(message))
        }
        Err(join_error) => {
            let message = if join_error.is_panic() {
                "action panicked".to_string()
            } else {
                "action was aborted".to_string()
            };
            tracing::error!(task_id = %id, error = %message, "task.action_failed");
            Err(OrchestrationError::ScheduledAction(message))
        }
    }
}

#[cfg(test)]
mod tests;
