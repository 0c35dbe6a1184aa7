//! Host resource sampling
//!
//! A single background loop reads CPU and memory utilization from the
//! operating system and writes it into the collector gauges. Readings are
//! best-effort: a failed query leaves the previous gauge value in place.

mod r#loop;
mod sysinfo_probe;

#[cfg(test)]
mod tests;

pub use r#loop::{SampleOutcome, SamplerConfig, SamplerLoop, SamplerLoopBuilder};
pub use sysinfo_probe::SysinfoProbe;

use crate::models::MemorySnapshot;
use anyhow::Result;
use std::time::Duration;

pub use async_trait::async_trait;

/// Source of host CPU and memory readings
#[async_trait]
pub trait SystemProbe: Send {
    /// Aggregate CPU utilization across all cores, in percent (0-100),
    /// measured over `window`
    async fn cpu_usage_percent(&mut self, window: Duration) -> Result<f64>;

    /// Current virtual memory usage and capacity
    async fn memory(&mut self) -> Result<MemorySnapshot>;
}

/// Create the probe for the running host
pub fn create_probe() -> Box<dyn SystemProbe> {
    if !sysinfo::IS_SUPPORTED_SYSTEM {
        tracing::warn!("Host platform not supported by sysinfo, samples will be skipped");
    }
    Box::new(SysinfoProbe::new())
}
