use super::signal::{CompletionSignal, SignalGuard, StepSignal};
use super::{Plan, Step};
use crate::agents::{Agent, AgentRegistry};
use crate::config::ExecutorConfig;
use crate::error::{OrchestrationError, Result};
use crate::llm::{ChatMessage, ChatResponse};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Runs a [`Plan`] against the agents of a registry.
///
/// Every step runs on its own task as soon as all of its dependencies have
/// completed. A step's context is the caller's history followed by each
/// dependency's messages in the order the step lists them. The final response
/// concatenates every step's messages in declared plan order.
pub struct PlanExecutor {
    registry: Arc<AgentRegistry>,
    step_timeout: Option<Duration>,
}

impl PlanExecutor {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            step_timeout: None,
        }
    }

    pub fn from_config(registry: Arc<AgentRegistry>, config: &ExecutorConfig) -> Self {
        Self::new(registry).with_step_timeout(config.step_timeout())
    }

    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Validate the plan, run it, and aggregate the step outputs.
    ///
    /// Nothing is spawned unless the plan is structurally valid and every
    /// step's agent resolves. The first step failure cancels the remaining
    /// steps; a failure caused by cancellation never masks the root cause.
    pub async fn execute(
        &self,
        plan: &Plan,
        history: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<ChatResponse> {
        plan.validate()?;
        let agents = self.resolve_agents(plan)?;

        let signals: HashMap<&str, Arc<CompletionSignal>> = plan
            .steps
            .iter()
            .map(|step| (step.id.as_str(), Arc::new(CompletionSignal::new())))
            .collect();

        let run_cancel = cancel.child_token();
        let history: Arc<[ChatMessage]> = history.into();
        let mut workers = JoinSet::new();
        let mut worker_steps = HashMap::with_capacity(plan.steps.len());

        for (index, (step, agent)) in plan.steps.iter().zip(agents).enumerate() {
            let dependencies = step
                .depends_on
                .iter()
                .filter_map(|dependency| {
                    signals
                        .get(dependency.as_str())
                        .map(|signal| (dependency.clone(), Arc::clone(signal)))
                })
                .collect();
            let Some(signal) = signals.get(step.id.as_str()) else {
                continue;
            };

            let worker = StepWorker {
                index,
                step: step.clone(),
                agent,
                history: Arc::clone(&history),
                dependencies,
                signal: Arc::clone(signal),
                cancel: run_cancel.clone(),
                timeout: self.step_timeout,
            };
            let handle = workers.spawn(worker.run());
            worker_steps.insert(handle.id(), index);
        }

        tracing::debug!(steps = plan.steps.len(), "plan.started");

        let mut outputs: Vec<Option<Arc<ChatResponse>>> = vec![None; plan.steps.len()];
        let mut failure: Option<OrchestrationError> = None;

        while let Some(joined) = workers.join_next_with_id().await {
            let (index, outcome) = match joined {
                Ok((_, (index, outcome))) => (index, outcome),
                Err(join_error) => {
                    let Some(&index) = worker_steps.get(&join_error.id()) else {
                        continue;
                    };
                    let step = &plan.steps[index];
                    let error = if join_error.is_panic() {
                        OrchestrationError::AgentExecution {
                            step: step.id.clone(),
                            agent: step.agent.clone(),
                            source: anyhow::anyhow!("agent panicked"),
                        }
                    } else {
                        OrchestrationError::Cancelled {
                            step: step.id.clone(),
                        }
                    };
                    // A worker that died before fulfilling must release its dependents.
                    if let Some(signal) = signals.get(step.id.as_str()) {
                        signal.fulfil(StepSignal::Failed);
                    }
                    (index, Err(error))
                }
            };

            match outcome {
                Ok(response) => outputs[index] = Some(response),
                Err(error) => {
                    let replace = failure
                        .as_ref()
                        .is_none_or(|current| current.is_cancellation() && !error.is_cancellation());
                    if replace {
                        failure = Some(error);
                    }
                    run_cancel.cancel();
                }
            }
        }

        if let Some(error) = failure {
            tracing::warn!(error = %error, "plan.failed");
            return Err(error);
        }

        let mut messages = Vec::new();
        for (step, output) in plan.steps.iter().zip(outputs) {
            let Some(output) = output else {
                return Err(OrchestrationError::Cancelled {
                    step: step.id.clone(),
                });
            };
            messages.extend(output.messages.iter().cloned());
        }

        tracing::debug!(messages = messages.len(), "plan.completed");
        Ok(ChatResponse::new(messages))
    }

    fn resolve_agents(&self, plan: &Plan) -> Result<Vec<Arc<dyn Agent>>> {
        plan.steps
            .iter()
            .map(|step| {
                self.registry
                    .resolve(&step.agent)
                    .ok_or_else(|| OrchestrationError::AgentNotFound {
                        step: step.id.clone(),
                        agent: step.agent.clone(),
                    })
            })
            .collect()
    }
}

struct StepWorker {
    index: usize,
    step: Step,
    agent: Arc<dyn Agent>,
    history: Arc<[ChatMessage]>,
    dependencies: Vec<(String, Arc<CompletionSignal>)>,
    signal: Arc<CompletionSignal>,
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl StepWorker {
    async fn run(self) -> (usize, Result<Arc<ChatResponse>>) {
        let index = self.index;
        (index, self.execute().await)
    }

    async fn execute(self) -> Result<Arc<ChatResponse>> {
        let _guard = SignalGuard::new(Arc::clone(&self.signal));
        let mut context = self.history.to_vec();

        for (dependency, signal) in &self.dependencies {
            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(self.cancelled()),
                outcome = signal.wait() => outcome,
            };
            match outcome {
                StepSignal::Completed(response) => {
                    context.extend(response.messages.iter().cloned());
                }
                StepSignal::Cancelled | StepSignal::Failed => {
                    tracing::debug!(
                        step = %self.step.id,
                        dependency = %dependency,
                        "step.skipped"
                    );
                    return Err(self.cancelled());
                }
            }
        }

        tracing::debug!(step = %self.step.id, agent = %self.step.agent, "step.started");

        let call = async {
            let respond = self.agent.respond(&context, self.cancel.clone());
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, respond)
                    .await
                    .unwrap_or_else(|_| {
                        Err(anyhow::anyhow!("timed out after {}s", limit.as_secs_f64()))
                    }),
                None => respond.await,
            }
        };
        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(self.cancelled()),
            outcome = call => outcome,
        };

        match outcome {
            Ok(response) => {
                let response = Arc::new(response);
                self.signal
                    .fulfil(StepSignal::Completed(Arc::clone(&response)));
                tracing::debug!(step = %self.step.id, agent = %self.step.agent, "step.completed");
                Ok(response)
            }
            Err(_) if self.cancel.is_cancelled() => Err(self.cancelled()),
            Err(source) => {
                self.signal.fulfil(StepSignal::Failed);
                tracing::warn!(
                    step = %self.step.id,
                    agent = %self.step.agent,
                    error = %format!("{source:#}"),
                    "step.failed"
                );
                Err(OrchestrationError::AgentExecution {
                    step: self.step.id.clone(),
                    agent: self.step.agent.clone(),
                    source,
                })
            }
        }
    }

    fn cancelled(&self) -> OrchestrationError {
        OrchestrationError::Cancelled {
            step: self.step.id.clone(),
        }
    }
}
