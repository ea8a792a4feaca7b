#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use taskmanager_server::auth::PasswordVerifier;
use taskmanager_server::db::UserStore;
use taskmanager_server::notify::NotificationSender;
use taskmanager_server::{AppState, InMemorySessionRegistry, Settings, User};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub async fn insert(&self, user: User) -> User {
        self.users.write().await.insert(user.id, user.clone());
        user
    }

    pub async fn remove(&self, id: Uuid) {
        self.users.write().await.remove(&id);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user_by_id(&self, id: Uuid) -> taskmanager_server::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> taskmanager_server::Result<Option<User>> {
        Ok(self.users.read().await.values().find(|u| u.email == email).cloned())
    }

    async fn find_users_for_hour(&self, hour: u32) -> taskmanager_server::Result<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.email_notification_enabled && u.email_notification_time == hour as i32)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> taskmanager_server::Result<bool> {
        Ok(match self.users.write().await.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                true
            }
            None => false,
        })
    }
}

/// Treats the stored hash as the plaintext password.
pub struct PlaintextVerifier;

impl PasswordVerifier for PlaintextVerifier {
    fn verify(&self, password: &str, stored_hash: &str) -> bool {
        password == stored_hash
    }

    fn hash(&self, password: &str) -> taskmanager_server::Result<String> {
        Ok(password.to_string())
    }
}

/// Counts sends and fails for every email in `failing`.
#[derive(Default)]
pub struct RecordingSender {
    pub attempts: Arc<RwLock<Vec<String>>>,
    pub failing: Vec<String>,
    pub calls: AtomicUsize,
}

impl RecordingSender {
    pub fn failing_for(emails: &[&str]) -> Self {
        Self {
            failing: emails.iter().map(|e| e.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, user: &User) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.attempts.write().await.push(user.email.clone());
        if self.failing.contains(&user.email) {
            anyhow::bail!("mailbox unavailable for {}", user.email);
        }
        Ok(())
    }
}

pub struct TestContext {
    pub state: AppState,
    pub users: InMemoryUserStore,
    pub registry: InMemorySessionRegistry,
}

pub fn test_context() -> TestContext {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let users = InMemoryUserStore::default();
    let registry = InMemorySessionRegistry::new();
    let state = AppState::new(
        config,
        Arc::new(registry.clone()),
        Arc::new(users.clone()),
        Arc::new(PlaintextVerifier),
    );

    TestContext { state, users, registry }
}
