pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod scheduler;

use std::sync::Arc;
use actix_web::{web, HttpResponse};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{Authenticator, CredentialCodec, SessionService, TokenPair};
pub use db::{DbOperations, InMemorySessionRegistry, Session, SessionRegistry, User};
pub use scheduler::{Schedule, Scheduler};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Registers `/health` and the `/api` routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .service(web::scope("/api").configure(auth::handlers::configure));
}

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub authenticator: Arc<Authenticator>,
    pub sessions: Arc<SessionService>,
    pub users: Arc<dyn db::UserStore>,
    pub passwords: Arc<dyn auth::PasswordVerifier>,
}

impl AppState {
    pub fn new(
        config: Settings,
        registry: Arc<dyn SessionRegistry>,
        users: Arc<dyn db::UserStore>,
        passwords: Arc<dyn auth::PasswordVerifier>,
    ) -> Self {
        let codec = Arc::new(CredentialCodec::from_config(&config.auth));

        Self {
            authenticator: Arc::new(Authenticator::new(codec.clone(), users.clone())),
            sessions: Arc::new(SessionService::new(codec, registry)),
            config: Arc::new(config),
            users,
            passwords,
        }
    }
}
