//! Notification sinks: where responses produced by fired scheduled prompts go.

use crate::llm::ChatResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Receives responses produced outside of a request/response cycle.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, response: ChatResponse);
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub response: ChatResponse,
    pub published_at: DateTime<Utc>,
}

pub type NotificationReceiver = broadcast::Receiver<Notification>;

/// Fans notifications out to every live subscriber.
///
/// Publishing with no subscribers drops the notification. Slow subscribers
/// observe `RecvError::Lagged` once they fall `capacity` messages behind.
pub struct BroadcastSink {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> NotificationReceiver {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl NotificationSink for BroadcastSink {
    fn publish(&self, response: ChatResponse) {
        let notification = Notification {
            response,
            published_at: Utc::now(),
        };
        if self.sender.send(notification).is_err() {
            tracing::debug!("notification dropped, no subscribers");
        }
    }
}

/// Writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn publish(&self, response: ChatResponse) {
        tracing::info!(text = %response.text(), "notification");
    }
}

/// Forwards each notification to several sinks in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

impl NotificationSink for FanoutSink {
    fn publish(&self, response: ChatResponse) {
        let Some((last, rest)) = self.sinks.split_last() else {
            return;
        };
        for sink in rest {
            sink.publish(response.clone());
        }
        last.publish(response);
    }
}
