use crate::agents::{Agent, AgentDescriptor, AgentRegistry, PromptAgent, SchedulingAgent};
use crate::config::Config;
use crate::llm::{ChatClient, EchoClient};
use crate::notify::NotificationSink;
use crate::scheduler::Scheduler;
use std::sync::Arc;

/// Client used for every agent. Each agent gets its own label so transcripts
/// show who answered.
pub type ClientFactory = dyn Fn(&str) -> Arc<dyn ChatClient> + Send + Sync;

pub fn echo_clients() -> Box<ClientFactory> {
    Box::new(|name| Arc::new(EchoClient::new(name)) as Arc<dyn ChatClient>)
}

/// Register the scheduling agent plus every prompt agent from `config`.
///
/// The capability catalog handed to prompt agents lists every agent,
/// including the scheduler.
pub fn build_registry(
    config: &Config,
    scheduler: &Scheduler,
    sink: Arc<dyn NotificationSink>,
    clients: &ClientFactory,
) -> AgentRegistry {
    let scheduling = SchedulingAgent::new(
        clients(crate::agents::SCHEDULING_AGENT_NAME),
        scheduler.clone(),
        sink,
    );

    let mut catalog: Vec<AgentDescriptor> = config
        .agents
        .iter()
        .map(|agent| AgentDescriptor {
            name: agent.name.clone(),
            description: agent.description.clone(),
        })
        .collect();
    catalog.push(scheduling.descriptor());
    catalog.sort_by(|a, b| a.name.cmp(&b.name));

    let mut registry = AgentRegistry::new();
    registry.register(Arc::new(scheduling));
    for agent in &config.agents {
        let mut prompt_agent =
            PromptAgent::new(&agent.name, &agent.description, clients(&agent.name));
        if let Some(prompt) = &agent.prompt {
            prompt_agent = prompt_agent.with_prompt(prompt).with_catalog(&catalog);
        }
        registry.register(Arc::new(prompt_agent));
    }
    registry
}
