use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Read-only view of an account as stored by the user store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub timezone: String,
    pub email_notification_enabled: bool,
    /// Delivery hour of the daily summary, 0-23.
    pub email_notification_time: i32,
}

impl User {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            timezone: "UTC".to_string(),
            email_notification_enabled: true,
            email_notification_time: 8,
        }
    }

    pub fn with_notifications(mut self, enabled: bool, hour: i32) -> Self {
        self.email_notification_enabled = enabled;
        self.email_notification_time = hour;
        self
    }
}

/// Registry row backing one live refresh credential.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, refresh_token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            refresh_token,
            expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
