use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where this config was loaded from. Not persisted.
    #[serde(skip)]
    pub config_path: PathBuf,
    pub executor: ExecutorConfig,
    pub scheduler: SchedulerConfig,
    pub observability: ObservabilityConfig,
    pub notifications: NotificationsConfig,
    pub agents: Vec<AgentConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            executor: ExecutorConfig::default(),
            scheduler: SchedulerConfig::default(),
            observability: ObservabilityConfig::default(),
            notifications: NotificationsConfig::default(),
            agents: default_agents(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Upper bound for a single step's agent call. Unset means no limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_timeout_secs: Option<u64>,
}

impl ExecutorConfig {
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of live tasks; 0 = unlimited.
    pub max_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Broadcast buffer size per subscriber.
    pub capacity: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

/// A prompt agent defined in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

fn default_agents() -> Vec<AgentConfig> {
    vec![AgentConfig {
        name: "generic".into(),
        description: "Answers general questions when no other agent fits.".into(),
        prompt: Some(
            "You are a helpful assistant. Other agents available to the user are:\n{agents}"
                .into(),
        ),
    }]
}
