//! Metrics collector - host resource and HTTP metrics sidecar
//!
//! Samples host CPU and memory in the background and serves them,
//! together with request metrics, on a Prometheus scrape endpoint.

use collector_lib::{
    api::{self, AppState, TimeSeededDelay},
    observability::{CollectorMetrics, StructuredLogger},
    sampler::{create_probe, SamplerLoopBuilder},
    CollectorConfig,
};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_NAME: &str = "metrics-collector";
const COLLECTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting metrics-collector");

    let config = CollectorConfig::load()?;
    let logger = StructuredLogger::new(SERVICE_NAME);

    // Registration failures are fatal
    let metrics = CollectorMetrics::new()?;

    // So is failing to bind the port
    let listener = api::bind(&config.listen_addr()).await?;
    logger.log_startup(COLLECTOR_VERSION, &config.listen_addr());

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let sampler = SamplerLoopBuilder::new()
        .probe(create_probe())
        .metrics(metrics.clone())
        .interval(config.sample_interval())
        .cpu_window(config.cpu_window())
        .build()?;
    let sampler_handle = tokio::spawn(sampler.run(shutdown_tx.subscribe()));

    let work = Arc::new(TimeSeededDelay::new(config.min_delay(), config.max_delay()));
    let app_state = Arc::new(AppState::new(metrics, work));

    let mut server_shutdown = shutdown_tx.subscribe();
    let mut api_handle = tokio::spawn(api::serve(listener, app_state, async move {
        let _ = server_shutdown.recv().await;
    }));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
        result = &mut api_handle => {
            let reason = match result {
                Ok(Ok(())) => "API server stopped".to_string(),
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            logger.log_task_failure("api_server", &reason);
            let _ = shutdown_tx.send(());
            sampler_handle.await?;
            anyhow::bail!("API server exited: {}", reason);
        }
    }

    let _ = shutdown_tx.send(());
    sampler_handle.await?;
    api_handle.await??;

    info!("Shutdown complete");
    Ok(())
}
