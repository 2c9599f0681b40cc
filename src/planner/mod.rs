//! Plans: dependency graphs of agent steps, and the machinery that produces
//! and runs them.

mod coordinator;
mod dag_contract;
mod executor;
mod model;
mod parser;
mod signal;
mod types;

pub use coordinator::{AgentCoordinator, COORDINATOR_AGENT_NAME};
pub use dag_contract::DagContract;
pub use executor::PlanExecutor;
pub use model::{DEFAULT_COORDINATOR_PROMPT, ModelPlanner, Planner};
pub use parser::{PlanParser, extract_json};
pub use signal::{CompletionSignal, StepSignal};
pub use types::{Plan, Step};
