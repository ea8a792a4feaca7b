//! Background maintenance jobs.
//!
//! The [`Scheduler`] owns one tokio task per registered job. Each task sleeps
//! until its [`Schedule`] says the next tick is due, runs the handler, and
//! goes back to sleep. Errors and panics from a handler are logged and the
//! schedule carries on.

mod jobs;

pub use jobs::{SessionSweepJob, SoftDeletePurgeJob};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::db::{SessionRegistry, TaskStore};
use crate::error::AppError;
use crate::notify::NotificationDispatchJob;
use crate::Result;

/// One idempotent unit of scheduled work.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Runs a single tick and returns how many records it touched.
    async fn run(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// When a job fires. Hourly and daily schedules are evaluated in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Minute 0 of every hour.
    Hourly,
    /// `hour`:00 every day.
    DailyAt { hour: u32 },
    /// Fixed period measured from the end of the previous tick.
    Every(Duration),
}

impl Schedule {
    /// First fire time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Schedule::Hourly => truncate(now, ChronoDuration::hours(1)) + ChronoDuration::hours(1),
            Schedule::DailyAt { hour } => {
                let today = truncate(now, ChronoDuration::days(1)) + ChronoDuration::hours(hour as i64);
                if today > now {
                    today
                } else {
                    today + ChronoDuration::days(1)
                }
            }
            Schedule::Every(period) => {
                now + ChronoDuration::from_std(period).unwrap_or_else(|_| ChronoDuration::hours(1))
            }
        }
    }
}

fn truncate(now: DateTime<Utc>, unit: ChronoDuration) -> DateTime<Utc> {
    now.duration_trunc(unit).unwrap_or(now)
}

struct ScheduledJob {
    name: &'static str,
    schedule: Schedule,
    handler: Arc<dyn JobHandler>,
}

struct RunningJobs {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

pub struct Scheduler {
    jobs: Vec<Arc<ScheduledJob>>,
    running: Mutex<Option<RunningJobs>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            running: Mutex::new(None),
        }
    }

    pub fn with_job(mut self, name: &'static str, schedule: Schedule, handler: Arc<dyn JobHandler>) -> Self {
        self.jobs.push(Arc::new(ScheduledJob { name, schedule, handler }));
        self
    }

    /// The three production jobs: hourly dispatch, daily purge, daily session sweep.
    pub fn standard(
        config: &SchedulerConfig,
        dispatch: NotificationDispatchJob,
        registry: Arc<dyn SessionRegistry>,
        tasks: Arc<dyn TaskStore>,
    ) -> Self {
        Self::new()
            .with_job("notification-dispatch", Schedule::Hourly, Arc::new(dispatch))
            .with_job(
                "soft-delete-purge",
                Schedule::DailyAt { hour: config.purge_hour },
                Arc::new(SoftDeletePurgeJob::new(tasks, ChronoDuration::days(config.purge_retention_days))),
            )
            .with_job(
                "session-sweep",
                Schedule::DailyAt { hour: config.sweep_hour },
                Arc::new(SessionSweepJob::new(registry)),
            )
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|j| j.name).collect()
    }

    /// Registers every job. Calling it while running restarts the schedule.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            warn!("scheduler already running, restarting");
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let handles = self
            .jobs
            .iter()
            .map(|job| tokio::spawn(run_job(job.clone(), cancel.child_token())))
            .collect();

        *running = Some(RunningJobs { cancel, handles });
        info!(jobs = self.jobs.len(), "scheduler started");
    }

    /// Cancels future ticks and waits for in-flight ticks to finish.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        running.cancel.cancel();
        for handle in running.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "scheduler task ended abnormally");
            }
        }
        info!("scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Runs the named job once, outside its schedule.
    pub async fn trigger(&self, name: &str) -> Result<u64> {
        let job = self
            .jobs
            .iter()
            .find(|j| j.name == name)
            .ok_or_else(|| AppError::ValidationError(format!("unknown job: {}", name)))?;

        invoke(job, Utc::now()).await
    }
}

async fn invoke(job: &ScheduledJob, now: DateTime<Utc>) -> Result<u64> {
    match AssertUnwindSafe(job.handler.run(now)).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(AppError::InternalError(format!("job {} panicked", job.name))),
    }
}

async fn run_job(job: Arc<ScheduledJob>, cancel: CancellationToken) {
    let mut last_fired: Option<DateTime<Utc>> = None;
    loop {
        // Calendar boundaries never repeat, even if the wall clock stepped back.
        let now = Utc::now();
        let from = match (job.schedule, last_fired) {
            (Schedule::Every(_), _) | (_, None) => now,
            (_, Some(last)) => last.max(now),
        };
        let due = job.schedule.next_after(from);
        let delay = (due - now).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        last_fired = Some(due);

        debug!(job = job.name, due = %due, "job tick started");
        match invoke(&job, due).await {
            Ok(affected) => info!(job = job.name, affected, "job tick finished"),
            Err(e) => error!(job = job.name, error = %e, "job tick failed"),
        }
    }
    debug!(job = job.name, "job loop stopped");
}
