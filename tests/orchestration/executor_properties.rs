use std::time::Duration;

use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use tapestry::OrchestrationError;
use tapestry::llm::ChatMessage;
use tapestry::planner::{Plan, PlanExecutor, PlanParser, Step};

use super::orchestration_harness::{Journal, TimedAgent, registry};

fn history() -> Vec<ChatMessage> {
    vec![ChatMessage::user("book dinner and tell alice")]
}

#[tokio::test(start_paused = true)]
async fn independent_steps_overlap() {
    let journal = Journal::default();
    let executor = PlanExecutor::new(registry(vec![
        TimedAgent::new("left", 200, &journal),
        TimedAgent::new("right", 200, &journal),
    ]));
    let plan = Plan::new(vec![Step::new("l", "left"), Step::new("r", "right")]);

    let started = Instant::now();
    assert_ok!(executor.execute(&plan, &history(), &CancellationToken::new()).await);

    assert!(started.elapsed() < Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn dependency_output_flows_into_dependent_context() {
    let journal = Journal::default();
    let executor = PlanExecutor::new(registry(vec![
        TimedAgent::new("booking", 20, &journal),
        TimedAgent::new("messenger", 5, &journal),
    ]));
    let plan = PlanParser::parse(
        r#"{"steps": [
            {"id": "book", "agent": "booking"},
            {"id": "tell", "agent": "messenger", "depends_on": ["book"]}
        ]}"#,
    )
    .unwrap();

    let response = assert_ok!(executor.execute(&plan, &history(), &CancellationToken::new()).await);
    assert_eq!(response.text(), "booking ok\nmessenger ok");

    let messenger = journal.get("messenger");
    assert_eq!(
        messenger.context,
        vec!["book dinner and tell alice".to_string(), "booking ok".to_string()]
    );
    assert!(journal.get("booking").finished <= messenger.started);
}

#[tokio::test(start_paused = true)]
async fn dependent_declared_first_still_waits() {
    let journal = Journal::default();
    let executor = PlanExecutor::new(registry(vec![
        TimedAgent::new("first", 50, &journal),
        TimedAgent::new("second", 1, &journal),
    ]));
    let plan = Plan::new(vec![
        Step::new("b", "second").after(["a"]),
        Step::new("a", "first"),
    ]);

    let response = assert_ok!(executor.execute(&plan, &history(), &CancellationToken::new()).await);

    assert_eq!(response.text(), "second ok\nfirst ok");
    assert!(journal.get("first").finished <= journal.get("second").started);
}

#[tokio::test]
async fn missing_agent_produces_no_partial_results() {
    let journal = Journal::default();
    let executor = PlanExecutor::new(registry(vec![TimedAgent::new("present", 0, &journal)]));
    let plan = Plan::new(vec![Step::new("a", "present"), Step::new("b", "absent")]);

    let error = assert_err!(executor.execute(&plan, &history(), &CancellationToken::new()).await);
    assert_eq!(error.to_string(), "agent 'absent' not found for step 'b'");
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn cycle_is_reported_with_its_path() {
    let journal = Journal::default();
    let executor = PlanExecutor::new(registry(vec![TimedAgent::new("x", 0, &journal)]));
    let plan = Plan::new(vec![
        Step::new("a", "x").after(["c"]),
        Step::new("b", "x").after(["a"]),
        Step::new("c", "x").after(["b"]),
    ]);

    let error = assert_err!(executor.execute(&plan, &history(), &CancellationToken::new()).await);
    assert!(matches!(error, OrchestrationError::DependencyDeadlock(ref message) if message == "cycle detected: a -> b -> c -> a"));
}

#[tokio::test(start_paused = true)]
async fn cancelled_token_fails_the_run() {
    let journal = Journal::default();
    let executor = PlanExecutor::new(registry(vec![TimedAgent::new("slow", 10_000, &journal)]));
    let plan = Plan::new(vec![Step::new("s", "slow")]);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let error = assert_err!(executor.execute(&plan, &history(), &cancel).await);

    assert!(error.is_cancellation());
    assert_eq!(error.step(), Some("s"));
}
