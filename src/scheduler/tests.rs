use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::BoxFuture;

fn counting_action(
    counter: &Arc<AtomicUsize>,
) -> impl Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static {
    let counter = Arc::clone(counter);
    move || -> BoxFuture<'static, anyhow::Result<()>> {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[tokio::test(start_paused = true)]
async fn one_shot_fires_once_and_is_disposed() {
    let scheduler = Scheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let handle = scheduler
        .schedule(counting_action(&counter), TimeDelta::seconds(5), false)
        .unwrap();
    assert_eq!(handle.state(), TaskState::Armed);
    assert_eq!(scheduler.active_count(), 1);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(handle.state(), TaskState::Disposed);
    assert_eq!(scheduler.active_count(), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn recurring_fires_every_period() {
    let scheduler = Scheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let handle = scheduler
        .schedule(counting_action(&counter), TimeDelta::seconds(10), true)
        .unwrap();

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 3);

    let snapshot = handle.snapshot().unwrap();
    assert_eq!(snapshot.fire_count, 3);
    assert_eq!(snapshot.state, TaskState::Armed);
    assert!(snapshot.recurring);
    assert!(snapshot.last_fired_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn zero_delay_one_shot_fires_promptly() {
    let scheduler = Scheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));

    scheduler
        .schedule(counting_action(&counter), TimeDelta::zero(), false)
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejects_negative_delay() {
    let scheduler = Scheduler::new();
    let error = scheduler
        .schedule(|| async { anyhow::Ok(()) }, TimeDelta::seconds(-1), false)
        .unwrap_err();
    assert!(matches!(error, OrchestrationError::InvalidArgument(_)));
    assert_eq!(scheduler.active_count(), 0);
}

#[tokio::test]
async fn rejects_recurring_zero_delay() {
    let scheduler = Scheduler::new();
    let error = scheduler
        .schedule(|| async { anyhow::Ok(()) }, TimeDelta::zero(), true)
        .unwrap_err();
    assert!(matches!(error, OrchestrationError::InvalidArgument(_)));
}

#[tokio::test]
async fn schedule_at_rejects_past_time() {
    let scheduler = Scheduler::new();
    let error = scheduler
        .schedule_at(None, || async { anyhow::Ok(()) }, Utc::now() - TimeDelta::minutes(1))
        .unwrap_err();
    assert!(error.to_string().contains("in the past"));
}

#[tokio::test(start_paused = true)]
async fn failing_recurring_task_keeps_firing() {
    let scheduler = Scheduler::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&attempts);

    let handle = scheduler
        .schedule_labeled(
            "flaky",
            move || {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(anyhow::anyhow!("downstream unavailable"))
                }
            },
            TimeDelta::seconds(1),
            true,
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let snapshot = handle.snapshot().unwrap();
    assert_eq!(snapshot.label.as_deref(), Some("flaky"));
    assert_eq!(snapshot.failure_count, 3);
    assert!(
        snapshot
            .last_error
            .as_deref()
            .unwrap()
            .contains("downstream unavailable")
    );
}

#[tokio::test(start_paused = true)]
async fn panicking_action_does_not_kill_the_task() {
    let scheduler = Scheduler::new();
    let handle = scheduler
        .schedule(
            || async {
                if true {
                    panic!("boom");
                }
                anyhow::Ok(())
            },
            TimeDelta::seconds(1),
            true,
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    let snapshot = handle.snapshot().unwrap();
    assert_eq!(snapshot.fire_count, 2);
    assert_eq!(snapshot.last_error.as_deref(), Some("scheduled action failed: action panicked"));
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_a_recurring_task() {
    let scheduler = Scheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let handle = scheduler
        .schedule(counting_action(&counter), TimeDelta::seconds(1), true)
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(handle.cancel());
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(handle.state(), TaskState::Disposed);
    assert!(!scheduler.cancel(handle.id()));
}

#[tokio::test(start_paused = true)]
async fn capacity_limit_is_enforced() {
    let scheduler = Scheduler::with_max_tasks(1);
    scheduler
        .schedule(|| async { anyhow::Ok(()) }, TimeDelta::seconds(60), false)
        .unwrap();

    let error = scheduler
        .schedule(|| async { anyhow::Ok(()) }, TimeDelta::seconds(60), false)
        .unwrap_err();
    assert!(error.to_string().contains("capacity"));
}

#[tokio::test(start_paused = true)]
async fn list_is_ordered_by_creation() {
    let scheduler = Scheduler::new();
    let first = scheduler
        .schedule_labeled("first", || async { anyhow::Ok(()) }, TimeDelta::seconds(60), false)
        .unwrap();
    let second = scheduler
        .schedule_labeled("second", || async { anyhow::Ok(()) }, TimeDelta::seconds(60), false)
        .unwrap();

    let ids: Vec<String> = scheduler.list().into_iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![first.id().to_string(), second.id().to_string()]);
    assert!(first.id().starts_with("task_"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_everything_and_refuses_new_tasks() {
    let scheduler = Scheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        scheduler
            .schedule(counting_action(&counter), TimeDelta::seconds(10), true)
            .unwrap();
    }

    scheduler.shutdown().await;
    assert!(scheduler.is_shut_down());
    assert_eq!(scheduler.active_count(), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    let error = scheduler
        .schedule(|| async { anyhow::Ok(()) }, TimeDelta::seconds(1), false)
        .unwrap_err();
    assert!(matches!(error, OrchestrationError::InvalidArgument(_)));
}
