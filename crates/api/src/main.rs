//! Courier intake API server binary entrypoint.

use std::future::IntoFuture;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use courier_common::config::AppConfig;
use courier_common::db::{create_pool, run_migrations};
use courier_common::shutdown::cancel_on_signal;

use courier_api::routes::create_app;
use courier_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("courier_api=debug,courier_outbox=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Courier API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    run_migrations(&pool).await?;

    // Build router
    let app = create_app(AppState::new(pool));

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on {}", addr);

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    let server = axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move { shutdown.cancelled().await }
        })
        .into_future();

    // In-flight requests get the shutdown budget, then the process exits anyway.
    let budget = config.shutdown_timeout();
    tokio::select! {
        result = server => result?,
        _ = async {
            shutdown.cancelled().await;
            tokio::time::sleep(budget).await;
        } => {
            tracing::warn!(
                timeout_secs = budget.as_secs(),
                "Shutdown budget exhausted, abandoning in-flight requests"
            );
        }
    }

    tracing::info!("Courier API server stopped.");
    Ok(())
}
