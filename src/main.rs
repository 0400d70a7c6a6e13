use std::sync::Arc;

use video_admin::api;
use video_admin::config::Config;
use video_admin::db::Database;
use video_admin::store::PgVideoStore;
use video_admin::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    video_admin::logging::init("video_admin=debug,tower_http=debug");

    let config = Config::load()?;
    tracing::info!("Configuration loaded successfully");

    let db = Database::connect(&config.database).await?;
    tracing::info!("Database connections established");

    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    let state = AppState::new(Arc::new(PgVideoStore::new(db.pg.clone())));
    let app = api::app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
