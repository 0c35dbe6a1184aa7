//! Sampling tests
//!
//! A scripted probe stands in for the host so gauge update and retention
//! can be checked tick by tick.

use super::{SamplerConfig, SamplerLoop, SamplerLoopBuilder, SystemProbe};
use crate::models::MemorySnapshot;
use crate::observability::CollectorMetrics;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_test::assert_ok;

/// Probe replaying a fixed sequence of readings; `None` means the query fails
struct ScriptedProbe {
    cpu: VecDeque<Option<f64>>,
    memory: VecDeque<Option<MemorySnapshot>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    fn new(cpu: Vec<Option<f64>>, memory: Vec<Option<MemorySnapshot>>) -> Self {
        Self {
            cpu: cpu.into(),
            memory: memory.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SystemProbe for ScriptedProbe {
    async fn cpu_usage_percent(&mut self, _window: Duration) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cpu
            .pop_front()
            .flatten()
            .ok_or_else(|| anyhow!("cpu query failed"))
    }

    async fn memory(&mut self) -> Result<MemorySnapshot> {
        self.memory
            .pop_front()
            .flatten()
            .ok_or_else(|| anyhow!("memory query failed"))
    }
}

fn snapshot(used_bytes: u64, total_bytes: u64) -> MemorySnapshot {
    MemorySnapshot {
        used_bytes,
        total_bytes,
    }
}

#[tokio::test]
async fn test_successful_tick_sets_exact_values() {
    let metrics = CollectorMetrics::new().unwrap();
    let probe = ScriptedProbe::new(vec![Some(37.5)], vec![Some(snapshot(3_000, 16_000))]);
    let mut sampler = SamplerLoop::new(Box::new(probe), metrics.clone(), SamplerConfig::default());

    let outcome = sampler.sample_once().await;

    assert!(outcome.cpu_updated);
    assert!(outcome.memory_updated);
    assert_eq!(metrics.cpu_usage(), 37.5);
    assert_eq!(metrics.memory_used(), 3_000.0);
    assert_eq!(metrics.memory_total(), 16_000.0);
}

#[tokio::test]
async fn test_failed_readings_keep_previous_values() {
    let metrics = CollectorMetrics::new().unwrap();
    let probe = ScriptedProbe::new(
        vec![Some(20.0), None],
        vec![Some(snapshot(1_000, 4_000)), None],
    );
    let mut sampler = SamplerLoop::new(Box::new(probe), metrics.clone(), SamplerConfig::default());

    sampler.sample_once().await;
    let outcome = sampler.sample_once().await;

    assert!(!outcome.cpu_updated);
    assert!(!outcome.memory_updated);
    assert_eq!(metrics.cpu_usage(), 20.0);
    assert_eq!(metrics.memory_used(), 1_000.0);
    assert_eq!(metrics.memory_total(), 4_000.0);
}

#[tokio::test]
async fn test_cpu_failure_does_not_block_memory_update() {
    let metrics = CollectorMetrics::new().unwrap();
    metrics.set_cpu_usage(55.0);
    let probe = ScriptedProbe::new(vec![None], vec![Some(snapshot(2_500, 8_000))]);
    let mut sampler = SamplerLoop::new(Box::new(probe), metrics.clone(), SamplerConfig::default());

    let outcome = sampler.sample_once().await;

    assert_eq!(
        outcome,
        super::SampleOutcome {
            cpu_updated: false,
            memory_updated: true,
        }
    );
    assert_eq!(metrics.cpu_usage(), 55.0);
    assert_eq!(metrics.memory_used(), 2_500.0);
}

#[tokio::test]
async fn test_gauges_are_overwritten_not_accumulated() {
    let metrics = CollectorMetrics::new().unwrap();
    let probe = ScriptedProbe::new(
        vec![Some(90.0), Some(10.0)],
        vec![Some(snapshot(6_000, 8_000)), Some(snapshot(500, 8_000))],
    );
    let mut sampler = SamplerLoop::new(Box::new(probe), metrics.clone(), SamplerConfig::default());

    sampler.sample_once().await;
    sampler.sample_once().await;

    assert_eq!(metrics.cpu_usage(), 10.0);
    assert_eq!(metrics.memory_used(), 500.0);
}

#[test]
fn test_sampler_config_default() {
    let config = SamplerConfig::default();
    assert_eq!(config.interval, Duration::from_secs(5));
    assert_eq!(config.cpu_window, Duration::from_secs(1));
}

#[test]
fn test_builder_requires_probe() {
    let result = SamplerLoopBuilder::new()
        .metrics(CollectorMetrics::new().unwrap())
        .build();

    assert!(result.is_err());
}

#[test]
fn test_builder_requires_metrics() {
    let probe = ScriptedProbe::new(vec![], vec![]);
    let result = SamplerLoopBuilder::new().probe(Box::new(probe)).build();

    assert!(result.is_err());
}

#[tokio::test]
async fn test_run_ticks_until_shutdown() {
    let metrics = CollectorMetrics::new().unwrap();
    let probe = ScriptedProbe::new(
        vec![Some(1.0); 1000],
        vec![Some(snapshot(10, 100)); 1000],
    );
    let calls = probe.calls.clone();

    let sampler = assert_ok!(SamplerLoopBuilder::new()
        .probe(Box::new(probe))
        .metrics(metrics.clone())
        .interval(Duration::from_millis(20))
        .cpu_window(Duration::ZERO)
        .build());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(sampler.run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown_tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("sampler did not stop after shutdown")
        .unwrap();

    let ticks = calls.load(Ordering::SeqCst);
    assert!(ticks >= 1, "expected at least one tick, got {}", ticks);
    assert_eq!(metrics.cpu_usage(), 1.0);
    assert_eq!(metrics.memory_total(), 100.0);
}

#[tokio::test]
async fn test_first_tick_waits_one_interval() {
    let metrics = CollectorMetrics::new().unwrap();
    let probe = ScriptedProbe::new(vec![Some(99.0)], vec![Some(snapshot(1, 2))]);
    let calls = probe.calls.clone();

    let sampler = SamplerLoopBuilder::new()
        .probe(Box::new(probe))
        .metrics(metrics.clone())
        .interval(Duration::from_secs(60))
        .build()
        .unwrap();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(sampler.run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(metrics.cpu_usage(), 0.0);
}
