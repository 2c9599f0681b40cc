use super::{Agent, AgentDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

/// Lookup from agent name to implementation.
///
/// Duplicate names follow a last-registration-wins policy: the newer agent
/// replaces the older one and the replaced agent is handed back.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: Arc<dyn Agent>) -> Option<Arc<dyn Agent>> {
        let name = agent.name().to_string();
        let replaced = self.agents.insert(name.clone(), agent);
        if replaced.is_some() {
            tracing::warn!(agent = %name, "agent registered twice, keeping the latest");
        } else {
            tracing::debug!(agent = %name, "agent registered");
        }
        replaced
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Sorted list of registered names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Capability catalog in name order.
    pub fn catalog(&self) -> Vec<AgentDescriptor> {
        let mut catalog: Vec<AgentDescriptor> =
            self.agents.values().map(|agent| agent.descriptor()).collect();
        catalog.sort_by(|a, b| a.name.cmp(&b.name));
        catalog
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
