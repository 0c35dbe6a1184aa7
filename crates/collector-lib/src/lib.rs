//! Library for the host metrics collector
//!
//! This crate provides:
//! - The Prometheus instrument set and structured logging
//! - Periodic host CPU and memory sampling
//! - The HTTP front end (status, liveness, metrics exposition)

pub mod api;
pub mod config;
pub mod models;
pub mod observability;
pub mod sampler;

pub use api::{AppState, FixedDelay, TimeSeededDelay, WorkDelay};
pub use config::CollectorConfig;
pub use models::*;
pub use observability::{CollectorMetrics, MetricsError, StructuredLogger};
