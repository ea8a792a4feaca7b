use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::UserStore;
use crate::notify::NotificationSender;
use crate::scheduler::JobHandler;
use crate::Result;

/// Sends the daily summary to every user whose delivery hour is the current UTC hour.
///
/// The stored timezone is not applied: a user asking for 8 o'clock gets
/// their summary at 08:00 UTC.
pub struct NotificationDispatchJob {
    users: Arc<dyn UserStore>,
    sender: Arc<dyn NotificationSender>,
}

impl NotificationDispatchJob {
    pub fn new(users: Arc<dyn UserStore>, sender: Arc<dyn NotificationSender>) -> Self {
        Self { users, sender }
    }

    /// Returns how many users were considered, not how many deliveries succeeded.
    pub async fn dispatch(&self, now: DateTime<Utc>) -> Result<usize> {
        let hour = now.hour();
        let users = self.users.find_users_for_hour(hour).await?;

        let mut failed = 0usize;
        for user in &users {
            if let Err(e) = self.sender.send(user).await {
                failed += 1;
                warn!(user_id = %user.id, error = %e, "failed to send daily summary");
            }
        }

        info!(hour, considered = users.len(), failed, "notification dispatch finished");
        Ok(users.len())
    }
}

#[async_trait]
impl JobHandler for NotificationDispatchJob {
    async fn run(&self, now: DateTime<Utc>) -> Result<u64> {
        Ok(self.dispatch(now).await? as u64)
    }
}
