use super::DagContract;
use crate::error::{OrchestrationError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// One unit of work in a plan: run `agent` once every step named in
/// `depends_on` has produced output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub agent: String,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub depends_on: Vec<String>,
}

impl Step {
    pub fn new(id: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent: agent.into(),
            depends_on: Vec::new(),
        }
    }

    pub fn after<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ordered list of steps. Declared order is the aggregation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn dag(&self) -> DagContract {
        let nodes = self.steps.iter().map(|step| step.id.clone()).collect();
        let edges = self
            .steps
            .iter()
            .flat_map(|step| {
                step.depends_on
                    .iter()
                    .map(|dependency| (dependency.clone(), step.id.clone()))
            })
            .collect();
        DagContract::new(nodes, edges)
    }

    /// Structural checks: at least one step, unique non-empty ids, every
    /// dependency known, no cycles. Agent names are not checked here.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(OrchestrationError::InvalidPlan(
                "plan must have at least one step".into(),
            ));
        }
        self.dag().validate()
    }

    pub fn execution_order(&self) -> Result<Vec<String>> {
        self.dag().topological_sort()
    }
}
