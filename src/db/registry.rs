//! Refresh session registry.
//!
//! One row per live refresh credential, keyed by the signed credential value.
//! Rows are inserted and deleted, never updated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::Session;
use crate::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn create(&self, owner_id: Uuid, refresh_token: &str, expires_at: DateTime<Utc>) -> Result<Session>;

    /// Returns the row only while `expires_at > now`.
    async fn find_live(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<Option<Session>>;

    /// Returns whether a row was actually removed by this call.
    async fn delete_by_value(&self, refresh_token: &str) -> Result<bool>;

    async fn delete_by_owner(&self, owner_id: Uuid) -> Result<u64>;

    /// Removes every row with `expires_at <= now`.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Process-local registry guarded by a single lock, one acquisition per operation.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn sessions_for(&self, owner_id: Uuid) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == owner_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn create(&self, owner_id: Uuid, refresh_token: &str, expires_at: DateTime<Utc>) -> Result<Session> {
        let session = Session::new(owner_id, refresh_token.to_string(), expires_at);
        self.sessions
            .write()
            .await
            .insert(session.refresh_token.clone(), session.clone());
        Ok(session)
    }

    async fn find_live(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(refresh_token)
            .filter(|s| s.is_live_at(now))
            .cloned())
    }

    async fn delete_by_value(&self, refresh_token: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(refresh_token).is_some())
    }

    async fn delete_by_owner(&self, owner_id: Uuid) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != owner_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_live_at(now));
        Ok((before - sessions.len()) as u64)
    }
}
