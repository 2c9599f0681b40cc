use crate::llm::ChatResponse;
use std::sync::Arc;
use tokio::sync::watch;

/// Terminal outcome of a step as seen by its dependents.
#[derive(Debug, Clone)]
pub enum StepSignal {
    Completed(Arc<ChatResponse>),
    /// The step stopped because the run was cancelled.
    Cancelled,
    /// The step's agent failed; dependents must not start.
    Failed,
}

/// Write-once, read-many completion slot for one step.
///
/// Only the first [`CompletionSignal::fulfil`] takes effect. Waiters that
/// subscribe after fulfilment observe the stored value immediately.
#[derive(Debug)]
pub struct CompletionSignal {
    slot: watch::Sender<Option<StepSignal>>,
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSignal {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    /// Returns `false` when the signal was already fulfilled.
    pub fn fulfil(&self, signal: StepSignal) -> bool {
        self.slot.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(signal);
            true
        })
    }

    pub fn get(&self) -> Option<StepSignal> {
        self.slot.borrow().clone()
    }

    pub async fn wait(&self) -> StepSignal {
        let mut receiver = self.slot.subscribe();
        let signal = match receiver.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        signal.unwrap_or(StepSignal::Cancelled)
    }
}

/// Fulfils the signal with [`StepSignal::Cancelled`] when dropped, so a worker
/// that is aborted, panics or returns early never leaves dependents waiting.
pub(super) struct SignalGuard {
    signal: Arc<CompletionSignal>,
}

impl SignalGuard {
    pub(super) fn new(signal: Arc<CompletionSignal>) -> Self {
        Self { signal }
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.signal.fulfil(StepSignal::Cancelled);
    }
}
