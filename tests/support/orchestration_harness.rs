#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use tapestry::agents::{Agent, AgentRegistry};
use tapestry::llm::{ChatMessage, ChatResponse};

/// One finished agent invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub agent: String,
    pub context: Vec<String>,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Invocation>>>);

impl Journal {
    pub fn entries(&self) -> Vec<Invocation> {
        self.0.lock().unwrap().clone()
    }

    pub fn get(&self, agent: &str) -> Invocation {
        self.entries()
            .into_iter()
            .find(|entry| entry.agent == agent)
            .unwrap_or_else(|| panic!("{agent} was never invoked"))
    }

    fn push(&self, invocation: Invocation) {
        self.0.lock().unwrap().push(invocation);
    }
}

/// Sleeps for a fixed time, then answers `"<name> ok"`.
pub struct TimedAgent {
    name: String,
    delay: Duration,
    journal: Journal,
}

impl TimedAgent {
    pub fn new(name: &str, delay_ms: u64, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::from_millis(delay_ms),
            journal: journal.clone(),
        }
    }
}

impl Agent for TimedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "answers after a fixed delay"
    }

    fn respond<'a>(
        &'a self,
        history: &'a [ChatMessage],
        _cancel: CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<ChatResponse>> {
        Box::pin(async move {
            let started = Instant::now();
            tokio::time::sleep(self.delay).await;
            self.journal.push(Invocation {
                agent: self.name.clone(),
                context: history.iter().map(ChatMessage::text).collect(),
                started,
                finished: Instant::now(),
            });
            Ok(ChatResponse::text_only(format!("{} ok", self.name)))
        })
    }
}

pub fn registry(agents: Vec<TimedAgent>) -> Arc<AgentRegistry> {
    let mut registry = AgentRegistry::new();
    for agent in agents {
        registry.register(Arc::new(agent));
    }
    Arc::new(registry)
}
