//! ratemeter demo server
//!
//! - Every path answers "Hello world!"
//! - `metrics.scrape_endpoint_path` serves Prometheus text
//! - Each window's request rate is logged

use tracing_subscriber::{fmt, EnvFilter};

use ratemeter_core::Result;
use ratemeter_http::{config, router};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, kind = e.kind().as_str(), "ratemeter exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ratemeter.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.server.listen_addr()?;

    let layer = cfg
        .metrics
        .layer_builder()
        .rate_observer(|rps| tracing::info!(requests_per_second = rps, "rate"))
        .build()?;
    let meter = layer.meter();
    meter.start().await?;

    let app = router::build_router(layer);

    tracing::info!(%listen, scrape = ?meter.scrape_path(), "ratemeter starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| ratemeter_core::RateMeterError::Internal(format!("bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ratemeter_core::RateMeterError::Internal(format!("server failed: {e}")))?;

    meter.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
