use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use taskmanager_server::auth::Argon2Verifier;
use taskmanager_server::config::SessionStoreKind;
use taskmanager_server::db::{SessionRegistry, TaskStore, UserStore};
use taskmanager_server::notify::{LogNotificationSender, NotificationDispatchJob};
use taskmanager_server::{configure_routes, AppError, AppState, DbOperations, InMemorySessionRegistry, Scheduler, Settings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> taskmanager_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Settings::new()?;
    config.validate()?;
    info!(environment = %config.environment, "Configuration loaded successfully");

    let db = DbOperations::new_with_options(
        &config.database.url,
        config.database.max_connections,
        Duration::from_secs(5),
    )
    .await?;
    db.run_migrations().await?;
    let db = Arc::new(db);

    let registry: Arc<dyn SessionRegistry> = match config.auth.session_store {
        SessionStoreKind::Postgres => db.clone(),
        SessionStoreKind::Memory => {
            warn!("Sessions are kept in memory and will not survive a restart");
            Arc::new(InMemorySessionRegistry::new())
        }
    };
    let users: Arc<dyn UserStore> = db.clone();
    let tasks: Arc<dyn TaskStore> = db.clone();

    let scheduler = Scheduler::standard(
        &config.scheduler,
        NotificationDispatchJob::new(users.clone(), Arc::new(LogNotificationSender)),
        registry.clone(),
        tasks,
    );
    if config.scheduler.enabled {
        scheduler.start().await;
    } else {
        info!("Scheduler disabled by configuration");
    }

    let state = web::Data::new(AppState::new(
        config.clone(),
        registry,
        users,
        Arc::new(Argon2Verifier),
    ));

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;
    info!("Starting server at {}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()));

    info!("Shutting down");
    scheduler.stop().await;
    db.close().await;

    server
}
