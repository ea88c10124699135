//! sv-server: HTTP surface of the video assembly service.
//!
//! This crate puts the assembly pipeline behind axum. It provides:
//!
//! - `POST /assemble-video` (also under `/api`): multipart in, MP4 out
//! - Outcome translation: typed job errors to JSON failure bodies
//! - Health, tool status, Prometheus metrics and Swagger UI
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod outcome;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use sv_av::{AssemblyEngine, FfmpegEngine, ToolRegistry};
use sv_core::config::Config;

use crate::context::AppContext;

/// Histogram buckets for job wall-clock time, in seconds, up to the
/// default deadline.
const ASSEMBLY_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// Build the production engine from discovered tools.
///
/// A missing ffmpeg does not prevent startup: every job will then fail with
/// an encoder error naming the missing tool, while health and tool status
/// keep answering.
pub fn build_engine(config: &Config, tools: &ToolRegistry) -> Arc<dyn AssemblyEngine> {
    match FfmpegEngine::from_registry(tools, config.encoding.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!("{e}; video assembly will fail until it is installed");
            Arc::new(FfmpegEngine::new(
                PathBuf::from("ffmpeg"),
                None,
                config.encoding.clone(),
            ))
        }
    }
}

/// Install the global Prometheus recorder. Returns `None` (and logs) if a
/// recorder is already installed or the builder rejects the buckets.
pub fn install_metrics() -> Option<PrometheusHandle> {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(outcome::ASSEMBLY_SECONDS.to_string()),
            ASSEMBLY_BUCKETS,
        )
        .map_err(|e| tracing::warn!("Invalid metrics buckets: {e}"))
        .ok()?;

    match builder.install_recorder() {
        Ok(handle) => {
            let upkeep = handle.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(5));
                loop {
                    interval.tick().await;
                    upkeep.run_upkeep();
                }
            });
            Some(handle)
        }
        Err(e) => {
            tracing::warn!("Metrics recorder not installed: {e}");
            None
        }
    }
}

/// Start the slopvid server.
///
/// Discovers tools, builds the [`AppContext`], and serves HTTP until a
/// shutdown signal is received.
pub async fn start(config: Config) -> sv_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    // Discover external tools.
    let tools = ToolRegistry::discover(&config.tools);
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}", info.name);
        }
    }

    let engine = build_engine(&config, &tools);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| sv_core::Error::Internal(format!("Invalid server address: {e}")))?;

    tracing::info!(
        "Assembly limits: {} byte upload ceiling, {}s deadline",
        config.assembly.max_upload_bytes,
        config.assembly.timeout_secs
    );

    let mut ctx = AppContext::new(config, tools, engine);
    if let Some(handle) = install_metrics() {
        ctx = ctx.with_metrics(handle);
    }

    let app = router::build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| sv_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Starting server on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| sv_core::Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
