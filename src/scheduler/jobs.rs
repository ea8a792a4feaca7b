use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::db::{SessionRegistry, TaskStore};
use crate::scheduler::JobHandler;
use crate::Result;

/// Deletes registry rows whose refresh credential has expired.
pub struct SessionSweepJob {
    registry: Arc<dyn SessionRegistry>,
}

impl SessionSweepJob {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl JobHandler for SessionSweepJob {
    async fn run(&self, now: DateTime<Utc>) -> Result<u64> {
        self.registry.sweep_expired(now).await
    }
}

/// Permanently removes tasks that have sat in the trash longer than `retention`.
pub struct SoftDeletePurgeJob {
    tasks: Arc<dyn TaskStore>,
    retention: Duration,
}

impl SoftDeletePurgeJob {
    pub fn new(tasks: Arc<dyn TaskStore>, retention: Duration) -> Self {
        Self { tasks, retention }
    }
}

#[async_trait]
impl JobHandler for SoftDeletePurgeJob {
    async fn run(&self, now: DateTime<Utc>) -> Result<u64> {
        self.tasks.purge_soft_deleted_older_than(now - self.retention).await
    }
}
