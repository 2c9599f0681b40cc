use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("TAPESTRY_LOG_LEVEL")
            && !level.is_empty()
        {
            self.observability.log_level = level;
        }

        if let Ok(secs) = std::env::var("TAPESTRY_STEP_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            self.executor.step_timeout_secs = Some(secs);
        }
    }
}
