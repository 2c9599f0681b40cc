use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::TimeDelta;
use futures_util::future::BoxFuture;
use tokio_test::{assert_err, assert_ok};

use tapestry::OrchestrationError;
use tapestry::scheduler::{Scheduler, TaskState};

#[tokio::test(start_paused = true)]
async fn zero_delay_one_shot_returns_active_count_to_baseline() {
    let scheduler = Scheduler::new();
    let baseline = scheduler.active_count();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);

    let handle = assert_ok!(scheduler.schedule(
        move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        },
        TimeDelta::zero(),
        false,
    ));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.active_count(), baseline);
    assert_eq!(handle.state(), TaskState::Disposed);
}

#[tokio::test(start_paused = true)]
async fn slow_recurring_action_never_overlaps_itself() {
    let scheduler = Scheduler::new();
    let running = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let fired = Arc::new(AtomicUsize::new(0));

    let action = {
        let running = Arc::clone(&running);
        let max_seen = Arc::clone(&max_seen);
        let fired = Arc::clone(&fired);
        move || -> BoxFuture<'static, anyhow::Result<()>> {
            let running = Arc::clone(&running);
            let max_seen = Arc::clone(&max_seen);
            let fired = Arc::clone(&fired);
            Box::pin(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                // Longer than the period.
                tokio::time::sleep(Duration::from_millis(150)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                fired.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    };

    let handle = assert_ok!(scheduler.schedule(action, TimeDelta::milliseconds(100), true));

    // Each cycle is delay + action = 250ms.
    tokio::time::sleep(Duration::from_millis(1_010)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 4);
    assert_eq!(max_seen.load(Ordering::SeqCst), 1);

    assert!(handle.cancel());
    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn recurring_fires_at_least_n_times_in_n_periods() {
    let scheduler = Scheduler::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);

    assert_ok!(scheduler.schedule(
        move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        },
        TimeDelta::seconds(60),
        true,
    ));

    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
    assert!(fired.load(Ordering::SeqCst) >= 5);
    scheduler.shutdown().await;
}

#[tokio::test]
async fn negative_delay_registers_nothing() {
    let scheduler = Scheduler::new();
    let error = assert_err!(scheduler.schedule(
        || async { anyhow::Ok(()) },
        TimeDelta::milliseconds(-1),
        false,
    ));

    assert!(matches!(error, OrchestrationError::InvalidArgument(_)));
    assert_eq!(scheduler.active_count(), 0);
    assert!(scheduler.list().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scheduling_from_many_tasks_settles_to_empty() {
    let scheduler = Scheduler::new();
    let fired = Arc::new(AtomicUsize::new(0));

    let mut producers = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let scheduler = scheduler.clone();
        let fired = Arc::clone(&fired);
        producers.spawn(async move {
            for _ in 0..50 {
                let counter = Arc::clone(&fired);
                scheduler
                    .schedule(
                        move || {
                            let counter = Arc::clone(&counter);
                            async move {
                                counter.fetch_add(1, Ordering::SeqCst);
                                anyhow::Ok(())
                            }
                        },
                        TimeDelta::milliseconds(1),
                        false,
                    )
                    .unwrap();
                tokio::task::yield_now().await;
            }
        });
    }
    while let Some(joined) = producers.join_next().await {
        assert_ok!(joined);
    }

    let settled = tokio::time::timeout(Duration::from_secs(10), async {
        while fired.load(Ordering::SeqCst) < 400 || scheduler.active_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert_ok!(settled);
    assert_eq!(fired.load(Ordering::SeqCst), 400);
    assert_eq!(scheduler.active_count(), 0);
    scheduler.shutdown().await;
}
