mod env_overrides;
mod loader;
#[cfg(test)]
mod test_env;
mod types;
mod validate;

pub use types::{
    AgentConfig, Config, ExecutorConfig, NotificationsConfig, ObservabilityConfig,
    SchedulerConfig,
};
