mod cleanup;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use stockroom_api::{AppState, router, session::SessionKeys};
use stockroom_db::Database;
use stockroom_storage::{PUBLIC_MOUNT, Storage};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockroom=debug,tower_http=info".into()),
        )
        .init();

    // Config
    let config = Config::from_env()?;

    // Capabilities, constructed once and threaded through state
    let db = Arc::new(Database::open(&config.db_path)?);
    let storage = Arc::new(Storage::new(config.storage_dir.clone(), config.public_base_url.clone()).await?);
    let sessions = Arc::new(SessionKeys::new(&config.session_secret, config.session_ttl_hours));

    let state = AppState {
        db: db.clone(),
        storage: storage.clone(),
        sessions,
    };

    // Orphan reconciliation sweep
    tokio::spawn(cleanup::run_sweep_loop(
        db,
        storage.clone(),
        config.sweep_interval_secs,
        config.sweep_grace,
    ));

    // Gated application routes, plus the ungated object mount
    let app = Router::new()
        .merge(router(state))
        .nest_service(PUBLIC_MOUNT, ServeDir::new(storage.dir()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Stockroom server listening on {}", addr);
    info!(
        "Sweep: every {}s, grace {}h",
        config.sweep_interval_secs,
        config.sweep_grace.as_secs() / 3600
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
