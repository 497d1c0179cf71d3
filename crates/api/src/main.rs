//! Matchday Push API server binary entrypoint.

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use matchday_common::config::AppConfig;

use matchday_api::routes::create_router;
use matchday_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "matchday_api=debug,matchday_notifier=info,matchday_registry=info,tower_http=debug",
            )
        }))
        .init();

    tracing::info!("Starting Matchday Push API server...");

    // Load configuration
    let config = AppConfig::from_env()?;
    let addr = config.bind_addr;

    // Build application state (spawns the delivery workers)
    let state = AppState::with_fcm(config)?;
    let pool = state.pool.clone();

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    // Let scheduled batches finish before exiting
    pool.shutdown().await;

    tracing::info!("Matchday Push API server stopped.");
    Ok(())
}
