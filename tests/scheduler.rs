mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{InMemoryUserStore, RecordingSender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use taskmanager_server::config::SchedulerConfig;
use taskmanager_server::db::TaskStore;
use taskmanager_server::notify::NotificationDispatchJob;
use taskmanager_server::scheduler::JobHandler;
use taskmanager_server::{AppError, InMemorySessionRegistry, Schedule, Scheduler, SessionRegistry, User};
use uuid::Uuid;

fn at_hour(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, hour, 0, 5).unwrap()
}

#[derive(Default)]
struct CountingTaskStore {
    purges: AtomicU64,
}

#[async_trait]
impl TaskStore for CountingTaskStore {
    async fn purge_soft_deleted_older_than(&self, _cutoff: DateTime<Utc>) -> taskmanager_server::Result<u64> {
        self.purges.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

#[tokio::test]
async fn test_dispatch_matches_only_configured_hour() {
    let users = InMemoryUserStore::default();
    users
        .insert(User::new("afternoon@example.com", "pw").with_notifications(true, 14))
        .await;
    users
        .insert(User::new("muted@example.com", "pw").with_notifications(false, 14))
        .await;

    let sender = Arc::new(RecordingSender::default());
    let job = NotificationDispatchJob::new(Arc::new(users), sender.clone());

    assert_eq!(job.dispatch(at_hour(13)).await.unwrap(), 0);
    assert_eq!(job.dispatch(at_hour(14)).await.unwrap(), 1);
    assert_eq!(job.dispatch(at_hour(15)).await.unwrap(), 0);

    assert_eq!(*sender.attempts.read().await, vec!["afternoon@example.com".to_string()]);
}

#[tokio::test]
async fn test_dispatch_isolates_per_user_failures() {
    let users = InMemoryUserStore::default();
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        users.insert(User::new(email, "pw").with_notifications(true, 8)).await;
    }

    let sender = Arc::new(RecordingSender::failing_for(&["b@example.com"]));
    let job = NotificationDispatchJob::new(Arc::new(users), sender.clone());

    assert_eq!(job.dispatch(at_hour(8)).await.unwrap(), 3);
    assert_eq!(
        *sender.attempts.read().await,
        vec!["a@example.com", "b@example.com", "c@example.com"]
    );
}

struct FlakyJob {
    calls: AtomicU64,
}

#[async_trait]
impl JobHandler for FlakyJob {
    async fn run(&self, _now: DateTime<Utc>) -> taskmanager_server::Result<u64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match call {
            0 => Err(AppError::InternalError("first tick fails".into())),
            1 => panic!("second tick panics"),
            _ => Ok(call),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_ticks_do_not_cancel_schedule() {
    let job = Arc::new(FlakyJob { calls: AtomicU64::new(0) });
    let scheduler = Scheduler::new().with_job("flaky", Schedule::Every(std::time::Duration::from_secs(30)), job.clone());

    scheduler.start().await;
    tokio::time::sleep(std::time::Duration::from_secs(4 * 30 + 1)).await;
    scheduler.stop().await;

    assert_eq!(job.calls.load(Ordering::SeqCst), 4);
}

struct SlowJob {
    started: AtomicU64,
    finished: AtomicU64,
}

#[async_trait]
impl JobHandler for SlowJob {
    async fn run(&self, _now: DateTime<Utc>) -> taskmanager_server::Result<u64> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }
}

#[tokio::test(start_paused = true)]
async fn test_stop_lets_in_flight_tick_finish() {
    let job = Arc::new(SlowJob {
        started: AtomicU64::new(0),
        finished: AtomicU64::new(0),
    });
    let scheduler = Scheduler::new().with_job("slow", Schedule::Every(std::time::Duration::from_secs(10)), job.clone());

    scheduler.start().await;
    tokio::time::sleep(std::time::Duration::from_secs(15)).await;
    assert_eq!(job.started.load(Ordering::SeqCst), 1);
    assert_eq!(job.finished.load(Ordering::SeqCst), 0);

    scheduler.stop().await;
    assert_eq!(job.finished.load(Ordering::SeqCst), 1);

    tokio::time::sleep(std::time::Duration::from_secs(120)).await;
    assert_eq!(job.started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_standard_scheduler_wires_all_jobs() {
    let config = SchedulerConfig {
        enabled: true,
        purge_hour: 3,
        sweep_hour: 4,
        purge_retention_days: 30,
    };
    let registry = InMemorySessionRegistry::new();
    registry
        .create(Uuid::new_v4(), "expired", Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    let tasks = Arc::new(CountingTaskStore::default());
    let users = InMemoryUserStore::default();
    let dispatch = NotificationDispatchJob::new(Arc::new(users), Arc::new(RecordingSender::default()));

    let scheduler = Scheduler::standard(&config, dispatch, Arc::new(registry.clone()), tasks.clone());

    assert_eq!(
        scheduler.job_names(),
        vec!["notification-dispatch", "soft-delete-purge", "session-sweep"]
    );
    assert_eq!(scheduler.trigger("session-sweep").await.unwrap(), 1);
    assert!(registry.is_empty().await);
    assert_eq!(scheduler.trigger("soft-delete-purge").await.unwrap(), 0);
    assert_eq!(tasks.purges.load(Ordering::SeqCst), 1);
}
