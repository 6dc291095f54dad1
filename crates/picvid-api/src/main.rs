//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use picvid_api::{create_router, metrics, ApiConfig, AppState};
use picvid_worker::{SlideshowOrchestrator, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("picvid=info,info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting picvid-api");

    let config = ApiConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    let worker_config = WorkerConfig::from_env();
    info!("Worker config: {:?}", worker_config);
    let shutdown_timeout = worker_config.shutdown_timeout;

    if let Err(e) = picvid_media::check_ffmpeg() {
        warn!("{}; every job will fail until FFmpeg is installed", e);
    }

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let state = AppState::new(config.clone(), worker_config);
    let orchestrator = Arc::clone(&state.orchestrator);
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&orchestrator)))
        .await
        .context("server error")?;

    info!("Waiting for in-flight jobs to complete...");
    if !orchestrator.wait_idle(shutdown_timeout).await {
        warn!(
            in_flight = orchestrator.in_flight(),
            "Shutdown timeout reached with jobs still running"
        );
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal(orchestrator: Arc<SlideshowOrchestrator>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
    orchestrator.shutdown();
}
