use thiserror::Error;

// ─── Orchestration errors ────────────────────────────────────────────────────

/// Structured error hierarchy for plan execution and deferred scheduling.
///
/// Validation variants (`InvalidArgument`, `InvalidPlan`, `DependencyDeadlock`,
/// `AgentNotFound`) are raised synchronously before any concurrent work
/// starts. Execution variants surface the first failure observed inside a
/// running plan. Glue code (config, CLI) keeps using `anyhow::Result` and
/// converts these with `?`.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    // ── Argument validation ─────────────────────────────────────────────
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // ── Plan validation ─────────────────────────────────────────────────
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("dependency deadlock: {0}")]
    DependencyDeadlock(String),

    #[error("agent '{agent}' not found for step '{step}'")]
    AgentNotFound { step: String, agent: String },

    // ── Plan execution ──────────────────────────────────────────────────
    #[error("agent '{agent}' failed on step '{step}': {source}")]
    AgentExecution {
        step: String,
        agent: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("step '{step}' cancelled")]
    Cancelled { step: String },

    // ── Deferred tasks ──────────────────────────────────────────────────
    #[error("scheduled action failed: {0}")]
    ScheduledAction(String),
}

impl OrchestrationError {
    /// Whether this error is a cancellation marker rather than a root cause.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Step id the error is attributed to, if any.
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::AgentNotFound { step, .. }
            | Self::AgentExecution { step, .. }
            | Self::Cancelled { step } => Some(step),
            _ => None,
        }
    }
}

pub type Result<T, E = OrchestrationError> = std::result::Result<T, E>;
