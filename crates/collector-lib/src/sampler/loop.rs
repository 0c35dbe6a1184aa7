//! Host sampling loop
//!
//! Periodically refreshes the CPU and memory gauges until shutdown.

use super::SystemProbe;
use crate::observability::CollectorMetrics;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Configuration for the sampling loop
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Time between ticks (default: 5 seconds)
    pub interval: Duration,
    /// CPU measurement window inside each tick (default: 1 second)
    pub cpu_window: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            cpu_window: Duration::from_secs(1),
        }
    }
}

/// Which gauges a single tick refreshed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SampleOutcome {
    pub cpu_updated: bool,
    pub memory_updated: bool,
}

/// Loop that writes host readings into the collector gauges
pub struct SamplerLoop {
    probe: Box<dyn SystemProbe>,
    metrics: CollectorMetrics,
    config: SamplerConfig,
}

impl SamplerLoop {
    pub fn new(
        probe: Box<dyn SystemProbe>,
        metrics: CollectorMetrics,
        config: SamplerConfig,
    ) -> Self {
        Self {
            probe,
            metrics,
            config,
        }
    }

    /// Run until a shutdown signal is received
    ///
    /// The first tick fires one full interval after start.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            cpu_window_ms = self.config.cpu_window.as_millis() as u64,
            "Starting host sampling loop"
        );

        let mut ticker = interval_at(Instant::now() + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.sample_once().await;
                    debug!(
                        cpu_updated = outcome.cpu_updated,
                        memory_updated = outcome.memory_updated,
                        "Sampling tick complete"
                    );
                }
                _ = shutdown.recv() => {
                    info!("Shutting down host sampling loop");
                    break;
                }
            }
        }
    }

    /// Take one CPU and one memory reading
    ///
    /// Each gauge is only written when its reading succeeds.
    pub async fn sample_once(&mut self) -> SampleOutcome {
        let mut outcome = SampleOutcome::default();

        match self.probe.cpu_usage_percent(self.config.cpu_window).await {
            Ok(percent) => {
                self.metrics.set_cpu_usage(percent);
                outcome.cpu_updated = true;
            }
            Err(e) => debug!(error = %e, "CPU reading failed, keeping previous value"),
        }

        match self.probe.memory().await {
            Ok(snapshot) => {
                self.metrics
                    .set_memory(snapshot.used_bytes, snapshot.total_bytes);
                outcome.memory_updated = true;
            }
            Err(e) => debug!(error = %e, "Memory reading failed, keeping previous value"),
        }

        outcome
    }
}

/// Builder for creating the sampling loop
pub struct SamplerLoopBuilder {
    probe: Option<Box<dyn SystemProbe>>,
    metrics: Option<CollectorMetrics>,
    config: SamplerConfig,
}

impl SamplerLoopBuilder {
    pub fn new() -> Self {
        Self {
            probe: None,
            metrics: None,
            config: SamplerConfig::default(),
        }
    }

    /// Set the host probe
    pub fn probe(mut self, probe: Box<dyn SystemProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Set the metrics the loop writes into
    pub fn metrics(mut self, metrics: CollectorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn cpu_window(mut self, window: Duration) -> Self {
        self.config.cpu_window = window;
        self
    }

    pub fn build(self) -> Result<SamplerLoop> {
        let probe = self
            .probe
            .ok_or_else(|| anyhow::anyhow!("Probe is required"))?;
        let metrics = self
            .metrics
            .ok_or_else(|| anyhow::anyhow!("Metrics are required"))?;

        Ok(SamplerLoop::new(probe, metrics, self.config))
    }
}

impl Default for SamplerLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
