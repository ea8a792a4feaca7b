//! Narrow views onto the user and task tables owned by the rest of the application.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::models::User;
use crate::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Users with notifications enabled whose delivery hour equals `hour`.
    async fn find_users_for_hour(&self, hour: u32) -> Result<Vec<User>>;

    /// Replaces the stored hash; `false` when no such user exists.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Permanently deletes soft-deleted tasks whose deletion predates `cutoff`.
    async fn purge_soft_deleted_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
