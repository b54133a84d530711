//! HTTP server lifecycle

use super::{
    middleware::{create_middleware_stack, create_trace_layer, request_logger},
    routes::create_router,
    AppState,
};
use crate::commands::cli::ServeArgs;
use anyhow::Context;
use axum::middleware;
use gsctl_core::api::{AppConfig, CliError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// `[http_server]` settings with command line overrides applied.
    pub fn resolve(args: &ServeArgs, cfg: &AppConfig) -> Self {
        Self {
            host: args
                .host
                .clone()
                .unwrap_or_else(|| cfg.http_server.host.clone()),
            port: args.port.unwrap_or(cfg.http_server.port),
            request_timeout: Duration::from_secs(cfg.http_server.request_timeout_secs),
        }
    }
}

/// Handle the `serve` command.
pub async fn handle_serve(args: ServeArgs, cfg: AppConfig) -> Result<(), CliError> {
    let config = ServerConfig::resolve(&args, &cfg);
    let session_id = Uuid::new_v4().to_string();
    let state = AppState::new(session_id, cfg);

    start_server(config, state).await?;
    Ok(())
}

pub async fn start_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let session_id = state.session_id.clone();
    let static_dir = state.config.http_server.static_dir.clone();

    let app = create_router(state)
        .layer(middleware::from_fn(request_logger))
        .layer(create_middleware_stack(config.request_timeout))
        .layer(create_trace_layer());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        session_id = %session_id,
        static_dir = %static_dir,
        "HTTP server listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C signal");
                }
                _ = wait_for_sigterm() => {
                    info!("Received SIGTERM signal");
                }
            }
            info!("Starting graceful shutdown...");
        })
        .await
        .context("HTTP server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler");
            std::future::pending::<()>().await
        }
    }
}

/// No SIGTERM on Windows; Ctrl+C is the only shutdown signal.
#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
