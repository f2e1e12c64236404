//! Metrics snapshot types and the provider boundary.
//!
//! The monitor does not originate metrics. A caller-supplied
//! [`MetricsProvider`] is polled once per tick and returns an immutable
//! [`MetricsSample`]: system-wide signals plus an optional per-worker map.
//! Providers may be blocking or non-blocking; the monitor assumes neither.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Point-in-time snapshot of system-wide health signals.
///
/// Produced once per poll by the external harness; the monitor never
/// mutates it. Rates and utilizations are fractions in `[0.0, 1.0]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Epoch ms when the snapshot was taken.
    pub timestamp_ms: u64,
    /// Completed transactions per second.
    pub throughput_tps: f64,
    /// Total requests issued so far.
    pub requests_total: u64,
    /// Requests that completed successfully.
    pub requests_successful: u64,
    /// Requests that failed.
    pub requests_failed: u64,
    /// Mean response time in milliseconds.
    pub avg_response_time_ms: f64,
    /// Median response time in milliseconds.
    pub p50_response_time_ms: f64,
    /// 95th percentile response time in milliseconds.
    pub p95_response_time_ms: f64,
    /// 99th percentile response time in milliseconds.
    pub p99_response_time_ms: f64,
    /// Worst observed response time in milliseconds.
    pub max_response_time_ms: f64,
    /// Fraction of requests that failed.
    pub error_rate: f64,
    /// Fraction of requests that timed out.
    pub timeout_rate: f64,
    /// CPU utilization of the system under load.
    pub cpu_utilization: f64,
    /// Memory utilization of the system under load.
    pub memory_utilization: f64,
    /// Network throughput in megabits per second.
    pub network_throughput_mbps: f64,
}

/// Point-in-time health reading for a single worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Worker identifier (matches the key in the per-worker map).
    pub agent_id: String,
    /// Composite health score in `[0.0, 1.0]`; higher is better.
    pub health_score: f64,
    /// Load currently assigned to this worker.
    pub current_load: f64,
    /// Fraction of this worker's requests that succeeded.
    pub success_rate: f64,
    /// Free-form description (worker type, region, etc.).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl AgentMetrics {
    /// Create a worker reading with an empty description.
    #[must_use]
    pub fn new(agent_id: impl Into<String>, health_score: f64) -> Self {
        Self {
            agent_id: agent_id.into(),
            health_score,
            current_load: 0.0,
            success_rate: 1.0,
            description: String::new(),
        }
    }
}

/// One poll's worth of metrics: system signals plus optional worker map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    /// System-wide signals for this tick.
    pub system: SystemMetrics,
    /// Per-worker readings, keyed by worker identifier. May be empty;
    /// an empty map simply excludes the worker-health signal from
    /// classification.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub agents: BTreeMap<String, AgentMetrics>,
}

impl MetricsSample {
    /// Build a sample carrying only system-wide signals.
    #[must_use]
    pub fn system_only(system: SystemMetrics) -> Self {
        Self {
            system,
            agents: BTreeMap::new(),
        }
    }
}

/// Arithmetic mean of per-worker health scores, `None` for an empty map.
#[must_use]
pub fn mean_health_score(agents: &BTreeMap<String, AgentMetrics>) -> Option<f64> {
    if agents.is_empty() {
        return None;
    }
    let sum: f64 = agents.values().map(|a| a.health_score).sum();
    Some(sum / agents.len() as f64)
}

/// Source of metrics snapshots, polled once per monitor tick.
///
/// Implementations may sample counters in-process or await an async
/// collection pipeline. A failure is a soft error: the monitor logs it,
/// skips the tick, and retries on the next interval.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Produce the snapshot for the current tick.
    async fn sample(&self) -> Result<MetricsSample, ProviderError>;
}

/// Adapter turning a zero-argument closure into a [`MetricsProvider`].
///
/// Lets the surrounding harness hand in a plain callable without writing
/// a trait impl:
///
/// ```ignore
/// let provider = FnProvider::new(move || Ok(sampler.snapshot()));
/// monitor.start_monitoring(Arc::new(provider))?;
/// ```
pub struct FnProvider<F> {
    sample_fn: F,
}

impl<F> FnProvider<F>
where
    F: Fn() -> Result<MetricsSample, ProviderError> + Send + Sync,
{
    /// Wrap a closure as a provider.
    pub fn new(sample_fn: F) -> Self {
        Self { sample_fn }
    }
}

#[async_trait]
impl<F> MetricsProvider for FnProvider<F>
where
    F: Fn() -> Result<MetricsSample, ProviderError> + Send + Sync,
{
    async fn sample(&self) -> Result<MetricsSample, ProviderError> {
        (self.sample_fn)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_system_metrics_are_healthy_zeros() {
        let m = SystemMetrics::default();
        assert_eq!(m.requests_total, 0);
        assert!(m.error_rate.abs() < f64::EPSILON);
        assert!(m.cpu_utilization.abs() < f64::EPSILON);
    }

    #[test]
    fn mean_health_of_empty_map_is_none() {
        assert_eq!(mean_health_score(&BTreeMap::new()), None);
    }

    #[test]
    fn mean_health_is_arithmetic_mean() {
        let mut agents = BTreeMap::new();
        agents.insert("w-1".to_string(), AgentMetrics::new("w-1", 0.95));
        agents.insert("w-2".to_string(), AgentMetrics::new("w-2", 0.90));
        let mean = mean_health_score(&agents).unwrap();
        assert!((mean - 0.925).abs() < 1e-9);
    }

    #[test]
    fn sample_serde_roundtrip() {
        let mut agents = BTreeMap::new();
        agents.insert("w-1".to_string(), AgentMetrics::new("w-1", 0.8));
        let sample = MetricsSample {
            system: SystemMetrics {
                timestamp_ms: 1_700_000_000_000,
                throughput_tps: 120.5,
                error_rate: 0.02,
                ..SystemMetrics::default()
            },
            agents,
        };
        let json = serde_json::to_string(&sample).unwrap();
        let parsed: MetricsSample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample);
    }

    #[test]
    fn empty_agent_map_omitted_from_json() {
        let sample = MetricsSample::system_only(SystemMetrics::default());
        let json = serde_json::to_string(&sample).unwrap();
        assert!(!json.contains("agents"));
    }

    #[tokio::test]
    async fn fn_provider_delegates_to_closure() {
        let provider = FnProvider::new(|| {
            Ok(MetricsSample::system_only(SystemMetrics {
                throughput_tps: 42.0,
                ..SystemMetrics::default()
            }))
        });
        let sample = provider.sample().await.unwrap();
        assert!((sample.system.throughput_tps - 42.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn fn_provider_propagates_failure() {
        let provider =
            FnProvider::new(|| Err(ProviderError::new("collector offline")));
        let err = provider.sample().await.unwrap_err();
        assert!(err.to_string().contains("collector offline"));
    }
}
