use super::Config;
use anyhow::{Result, bail};
use std::collections::HashSet;

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.notifications.capacity == 0 {
            bail!("notifications.capacity must be greater than 0");
        }

        if crate::observability::parse_level(&self.observability.log_level).is_none() {
            bail!(
                "observability.log_level '{}' is not one of trace, debug, info, warn, error",
                self.observability.log_level
            );
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                bail!("agents: name cannot be empty");
            }
            if !seen.insert(agent.name.as_str()) {
                bail!("agents: duplicate agent name '{}'", agent.name);
            }
        }
        Ok(())
    }
}
