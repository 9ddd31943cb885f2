//! songbook-api - Song catalog HTTP service
//!
//! CRUD over songs and their performing groups, backed by SQLite.
//! New songs are enriched from an external song details service.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use songbook_api::cli::Args;
use songbook_api::services::MusicInfoClient;
use songbook_api::{build_router, AppState};
use songbook_common::config::{ServiceConfig, TomlConfig, DEFAULT_CONFIG_FILE};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let file_config = TomlConfig::load_optional(&config_path)
        .context("Failed to load config file")?;
    let file_found = file_config.is_some();

    let config = ServiceConfig::resolve(args.overrides(), file_config.unwrap_or_default())
        .context("Invalid configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("songbook_api={0},songbook_common={0},tower_http={0}", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting songbook-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if dotenv_loaded {
        info!("Loaded environment from .env");
    }
    if file_found {
        info!("Loaded config file {}", config_path.display());
    } else {
        warn!("Config file {} not found, using defaults", config_path.display());
    }

    info!("Database path: {}", config.database_path.display());
    let pool = match songbook_common::db::init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let music_info = match &config.music_info_url {
        Some(url) => {
            info!("Music info service: {}", url);
            Some(
                MusicInfoClient::new(url.clone(), config.music_info_timeout)
                    .context("Failed to build music info client")?,
            )
        }
        None => {
            warn!("No music info service configured; new songs will be stored without details");
            None
        }
    };

    let state = AppState::new(pool.clone(), music_info, config.request_timeout);
    let app = build_router(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("songbook-api listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
