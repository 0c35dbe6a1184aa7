//! Collector configuration
//!
//! The service exposes no tunables: every value here is a fixed default,
//! assembled through the `config` builder so wiring code and tests share one
//! definition.

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// Collector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// HTTP port for the status, health and metrics routes
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Host sampling period in seconds
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,

    /// CPU measurement window in seconds
    #[serde(default = "default_cpu_window")]
    pub cpu_window_secs: u64,

    /// Lower bound of the simulated work delay (inclusive)
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound of the simulated work delay (exclusive)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_listen_port() -> u16 {
    8080
}

fn default_sample_interval() -> u64 {
    5
}

fn default_cpu_window() -> u64 {
    1
}

fn default_min_delay() -> u64 {
    100
}

fn default_max_delay() -> u64 {
    500
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            sample_interval_secs: default_sample_interval(),
            cpu_window_secs: default_cpu_window(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl CollectorConfig {
    /// Load the fixed configuration
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .set_default("listen_port", default_listen_port())?
            .set_default("sample_interval_secs", default_sample_interval())?
            .set_default("cpu_window_secs", default_cpu_window())?
            .set_default("min_delay_ms", default_min_delay())?
            .set_default("max_delay_ms", default_max_delay())?
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Address the HTTP server binds to
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.listen_port)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn cpu_window(&self) -> Duration {
        Duration::from_secs(self.cpu_window_secs)
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}
