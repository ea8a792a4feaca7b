//! Scheduled per-user notification dispatch.

mod dispatch;

pub use dispatch::NotificationDispatchJob;

use async_trait::async_trait;
use tracing::info;

use crate::db::User;

/// Delivers the daily summary to one user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, user: &User) -> anyhow::Result<()>;
}

/// Records the would-be delivery in the log instead of sending mail.
#[derive(Debug, Default, Clone)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, user: &User) -> anyhow::Result<()> {
        info!(user_id = %user.id, email = %user.email, "daily summary queued for delivery");
        Ok(())
    }
}
