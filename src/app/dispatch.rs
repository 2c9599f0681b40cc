use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::llm::{ChatMessage, messages_to_text};
use crate::notify::{BroadcastSink, FanoutSink, LogSink, NotificationSink};
use crate::planner::{PlanExecutor, PlanParser};
use crate::scheduler::{Scheduler, TaskState, parse_delay};
use crate::tools::DeferredPrompt;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::wiring::{build_registry, echo_clients};

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Validate { plan } => validate_plan(&plan),
        Commands::Run { plan, message } => run_plan(&config, &plan, message).await,
        Commands::Schedule {
            message,
            after,
            recurring,
        } => schedule_prompt(&config, &message, &after, recurring).await,
    }
}

fn read_plan(path: &Path) -> Result<crate::planner::Plan> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file {}", path.display()))?;
    Ok(PlanParser::parse(&json)?)
}

fn validate_plan(path: &Path) -> Result<()> {
    let plan = read_plan(path)?;
    let order = plan.execution_order()?;
    println!("Plan is valid ({} steps).", plan.steps.len());
    for (position, id) in order.iter().enumerate() {
        let agent = plan.step(id).map_or("?", |step| step.agent.as_str());
        println!("  {}. {id} -> {agent}", position + 1);
    }
    Ok(())
}

async fn run_plan(config: &Config, path: &Path, message: String) -> Result<()> {
    let plan = read_plan(path)?;

    let scheduler = Scheduler::from_config(&config.scheduler);
    let registry = Arc::new(build_registry(
        config,
        &scheduler,
        Arc::new(LogSink),
        echo_clients().as_ref(),
    ));
    let executor = PlanExecutor::from_config(registry, &config.executor);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling plan");
            on_interrupt.cancel();
        }
    });

    let history = vec![ChatMessage::user(message)];
    let result = executor.execute(&plan, &history, &cancel).await;
    shutdown_scheduler(&scheduler).await;

    let response = result?;
    println!("{}", messages_to_text(&response.messages));
    Ok(())
}

async fn schedule_prompt(config: &Config, prompt: &str, after: &str, recurring: bool) -> Result<()> {
    let delay = parse_delay(after)?;

    let broadcast = Arc::new(BroadcastSink::new(config.notifications.capacity));
    let mut notifications = broadcast.subscribe();
    let sink: Arc<dyn NotificationSink> = Arc::new(FanoutSink::new(vec![
        Arc::new(LogSink) as Arc<dyn NotificationSink>,
        broadcast,
    ]));

    let scheduler = Scheduler::from_config(&config.scheduler);
    let deferred = DeferredPrompt::new(
        scheduler.clone(),
        echo_clients()(crate::agents::SCHEDULING_AGENT_NAME),
        sink,
    );
    let handle = deferred.schedule_in(prompt, delay, recurring)?;
    println!("Scheduled {} (Ctrl-C to stop).", handle.id());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = notifications.recv() => match received {
                Ok(notification) => {
                    println!(
                        "[{}] {}",
                        notification.published_at.to_rfc3339(),
                        notification.response.text()
                    );
                    if !recurring {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notifications lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    shutdown_scheduler(&scheduler).await;
    Ok(())
}

/// Shut the scheduler down, warning about tasks that will never fire.
/// Returns how many were dropped.
async fn shutdown_scheduler(scheduler: &Scheduler) -> usize {
    let pending: Vec<_> = scheduler
        .list()
        .into_iter()
        .filter(|task| task.state == TaskState::Armed && (task.recurring || task.fire_count == 0))
        .collect();
    if !pending.is_empty() {
        let labels: Vec<&str> = pending
            .iter()
            .map(|task| task.label.as_deref().unwrap_or(task.id.as_str()))
            .collect();
        tracing::warn!(
            pending = pending.len(),
            tasks = ?labels,
            "scheduler stopping with armed tasks; they will not fire"
        );
    }
    scheduler.shutdown().await;
    pending.len()
}
