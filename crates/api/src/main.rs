use std::sync::Arc;

use bistro_core::store::RecordStore;
use bistro_core::submit::SubmitGuard;
use bistro_db::PgRecordStore;
use bistro_events::{EventBus, EventLog, EventNotifier, NotificationConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bistro_api::config::ServerConfig;
use bistro_api::router::build_app_router;
use bistro_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bistro_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = bistro_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    bistro_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    bistro_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool.clone()));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let event_log_handle = tokio::spawn(EventLog::run(event_bus.subscribe()));

    // --- Submit Guard ---
    let notifier = EventNotifier::new(Arc::clone(&event_bus), NotificationConfig::from_env())
        .expect("Failed to set up submission notifications");
    let submit_guard = SubmitGuard::new(Arc::clone(&store), Arc::new(notifier));
    tracing::info!("Event log and submission notifier started");

    // --- App state ---
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
        submit_guard,
        event_bus: Arc::clone(&event_bus),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = config.bind_addr().expect("Invalid HOST address");
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Closing the bus ends the event log once in-flight notifications have
    // released their handles.
    drop(event_bus);
    if tokio::time::timeout(config.shutdown_timeout(), event_log_handle).await.is_err() {
        tracing::warn!("Event log did not stop within the shutdown timeout");
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
