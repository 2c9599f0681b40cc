use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

use tapestry::agents::{Agent, AgentRegistry, PromptAgent, SchedulingAgent};
use tapestry::llm::{ChatClient, ChatMessage, ChatRequest, ChatResponse, EchoClient};
use tapestry::notify::BroadcastSink;
use tapestry::planner::{AgentCoordinator, ModelPlanner, PlanExecutor};
use tapestry::scheduler::Scheduler;

/// Returns a fixed plan for planning requests and echoes everything else.
struct PlanningModel {
    plan: &'static str,
    seen: Mutex<Vec<String>>,
}

impl ChatClient for PlanningModel {
    fn name(&self) -> &str {
        "planning-model"
    }

    fn complete(&self, request: ChatRequest) -> BoxFuture<'_, anyhow::Result<ChatResponse>> {
        let prompt = request
            .messages
            .first()
            .map(ChatMessage::text)
            .unwrap_or_default();
        self.seen.lock().unwrap().push(prompt);
        let plan = self.plan;
        Box::pin(async move { Ok(ChatResponse::text_only(format!("```json\n{plan}\n```"))) })
    }
}

#[tokio::test(start_paused = true)]
async fn coordinator_plans_and_runs_scheduler_alongside_prompt_agents() {
    let scheduler = Scheduler::new();
    let sink = Arc::new(BroadcastSink::new(8));

    let mut registry = AgentRegistry::new();
    registry.register(Arc::new(PromptAgent::new(
        "memory_retrieval",
        "Recalls what the user said before",
        Arc::new(EchoClient::new("memory")),
    )));
    registry.register(Arc::new(SchedulingAgent::new(
        Arc::new(EchoClient::new("scheduler")),
        scheduler.clone(),
        sink,
    )));
    let registry = Arc::new(registry);

    let model = Arc::new(PlanningModel {
        plan: r#"{"steps": [
            {"id": "memory", "agent": "memory_retrieval"},
            {"id": "scheduler", "agent": "tasks_scheduler", "depends_on": ["memory"]}
        ]}"#,
        seen: Mutex::new(Vec::new()),
    });
    let coordinator = AgentCoordinator::new(
        Arc::new(ModelPlanner::new(model.clone())),
        PlanExecutor::new(Arc::clone(&registry)).with_step_timeout(Some(Duration::from_secs(5))),
    );

    let response = assert_ok!(
        Agent::respond(
            &coordinator,
            &[ChatMessage::user("remind me about the dentist")],
            CancellationToken::new(),
        )
        .await
    );

    let lines: Vec<String> = response.messages.iter().map(ChatMessage::text).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "memory: remind me about the dentist");
    assert_eq!(lines[1], "scheduler: memory: remind me about the dentist");

    let seen = model.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("Recalls what the user said before"));
    assert!(seen[0].contains("remind me about the dentist"));
}
