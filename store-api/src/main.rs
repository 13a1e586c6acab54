//! # store-api
//!
//! REST API over stores and the items they sell, backed by SQLite.
//!
//! ## Architecture
//!
//! - **Models**: users, stores, and items persisted through a single shared SQLite connection
//! - **Auth**: `/auth` exchanges username/password for an HS256 JWT; `GET /item/{name}` requires it
//! - **HTTP**: Axum router with rate limiting, request IDs, and graceful shutdown

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

mod auth;
mod config;
mod db;
mod http;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::TokenIssuer;
use crate::config::{AppConfig, Cli};
use crate::db::Database;
use crate::http::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().context("failed to initialize logging")?;

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).context("failed to load configuration")?;
    info!(
        bind = %config.bind,
        database = %config.database.display(),
        token_ttl = %humantime::format_duration(config.token_ttl),
        rate_limit_requests_per_second = config.rate_limit.requests_per_second,
        rate_limit_burst = config.rate_limit.burst,
        "configuration loaded"
    );

    let db = Database::open(&config.database).with_context(|| {
        format!("failed to open database {}", config.database.display())
    })?;
    info!(database = %config.database.display(), "database ready");

    let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl);
    let state = AppState {
        db,
        tokens: Arc::new(tokens),
        rate_limit: config.rate_limit,
    };

    let app = router(state);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    let shutdown = tokio::signal::ctrl_c();
    info!(bind = %config.bind, "store-api listening");

    serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = shutdown.await;
        info!("shutting down gracefully");
    })
    .await
    .context("server exited with error")
}

/// Initialize tracing subscriber with `RUST_LOG` env filter (default: `info`).
fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
