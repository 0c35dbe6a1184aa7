//! sysinfo-backed host probe
//!
//! CPU usage is a delta between two counter refreshes, so each reading
//! sleeps for the measurement window in between.

use super::SystemProbe;
use crate::models::MemorySnapshot;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;
use sysinfo::System;

/// Probe reading host counters through `sysinfo`
pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SystemProbe for SysinfoProbe {
    async fn cpu_usage_percent(&mut self, window: Duration) -> Result<f64> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            bail!("CPU usage is not available on this platform");
        }

        self.system.refresh_cpu();
        tokio::time::sleep(window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)).await;
        self.system.refresh_cpu();

        if self.system.cpus().is_empty() {
            bail!("No CPUs reported by the host");
        }

        let usage = self.system.global_cpu_info().cpu_usage() as f64;
        if !usage.is_finite() {
            bail!("CPU usage reading is not a number: {}", usage);
        }

        Ok(usage.clamp(0.0, 100.0))
    }

    async fn memory(&mut self) -> Result<MemorySnapshot> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            bail!("Memory usage is not available on this platform");
        }

        self.system.refresh_memory();

        let total_bytes = self.system.total_memory();
        if total_bytes == 0 {
            bail!("Host reported zero total memory");
        }

        Ok(MemorySnapshot {
            used_bytes: self.system.used_memory(),
            total_bytes,
        })
    }
}
