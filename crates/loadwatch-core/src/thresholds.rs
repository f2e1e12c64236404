//! Per-signal, per-level classification cutoffs.
//!
//! One cutoff per monitored signal per non-`None` level. For
//! higher-is-worse signals (error rate, CPU, memory) the cutoffs must
//! strictly increase with severity; for worker health (higher is better)
//! they must strictly decrease. Violations are rejected at construction
//! rather than silently misclassifying.

use serde::{Deserialize, Serialize};

use crate::error::ThresholdError;

/// Cutoff values for each monitored signal at each severity level.
///
/// Constructed once and immutable thereafter. Use struct-update syntax to
/// override individual cutoffs, then [`validated`](Self::validated) to
/// check ordering:
///
/// ```ignore
/// let thresholds = DegradationThresholds {
///     moderate_error_rate: 0.02,
///     severe_error_rate: 0.08,
///     critical_error_rate: 0.15,
///     ..DegradationThresholds::default()
/// }
/// .validated()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationThresholds {
    /// Error rate at or above which the system is moderately degraded.
    pub moderate_error_rate: f64,
    /// Error rate at or above which the system is severely degraded.
    pub severe_error_rate: f64,
    /// Error rate at or above which the system is critically degraded.
    pub critical_error_rate: f64,

    /// CPU utilization cutoff for moderate degradation.
    pub moderate_cpu_utilization: f64,
    /// CPU utilization cutoff for severe degradation.
    pub severe_cpu_utilization: f64,
    /// CPU utilization cutoff for critical degradation.
    pub critical_cpu_utilization: f64,

    /// Memory utilization cutoff for moderate degradation.
    pub moderate_memory_utilization: f64,
    /// Memory utilization cutoff for severe degradation.
    pub severe_memory_utilization: f64,
    /// Memory utilization cutoff for critical degradation.
    pub critical_memory_utilization: f64,

    /// Mean worker health at or below which degradation is moderate.
    /// Health is higher-is-better, so these cutoffs descend.
    pub moderate_agent_health: f64,
    /// Mean worker health cutoff for severe degradation.
    pub severe_agent_health: f64,
    /// Mean worker health cutoff for critical degradation.
    pub critical_agent_health: f64,
}

impl Default for DegradationThresholds {
    fn default() -> Self {
        Self {
            moderate_error_rate: 0.01,  // 1% of requests failing
            severe_error_rate: 0.05,    // 5%
            critical_error_rate: 0.10,  // 10%

            moderate_cpu_utilization: 0.80,
            severe_cpu_utilization: 0.90,
            critical_cpu_utilization: 0.95,

            moderate_memory_utilization: 0.85,
            severe_memory_utilization: 0.92,
            critical_memory_utilization: 0.96,

            moderate_agent_health: 0.80, // mean health below this is moderate
            severe_agent_health: 0.60,
            critical_agent_health: 0.40,
        }
    }
}

impl DegradationThresholds {
    /// Validate cutoff ordering and domains, consuming self.
    pub fn validated(self) -> Result<Self, ThresholdError> {
        self.validate()?;
        Ok(self)
    }

    /// Check that every cutoff is a fraction in `[0.0, 1.0]` and that
    /// cutoffs escalate strictly with severity.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        let ascending = [
            (
                "error_rate",
                [
                    self.moderate_error_rate,
                    self.severe_error_rate,
                    self.critical_error_rate,
                ],
            ),
            (
                "cpu_utilization",
                [
                    self.moderate_cpu_utilization,
                    self.severe_cpu_utilization,
                    self.critical_cpu_utilization,
                ],
            ),
            (
                "memory_utilization",
                [
                    self.moderate_memory_utilization,
                    self.severe_memory_utilization,
                    self.critical_memory_utilization,
                ],
            ),
        ];

        for (signal, cutoffs) in ascending {
            check_domain(signal, &cutoffs)?;
            check_strictly_ascending(signal, &cutoffs)?;
        }

        let health = [
            self.moderate_agent_health,
            self.severe_agent_health,
            self.critical_agent_health,
        ];
        check_domain("agent_health", &health)?;
        check_strictly_descending("agent_health", &health)?;

        Ok(())
    }
}

const LEVEL_NAMES: [&str; 3] = ["moderate", "severe", "critical"];

fn check_domain(signal: &'static str, cutoffs: &[f64; 3]) -> Result<(), ThresholdError> {
    for &value in cutoffs {
        if !(0.0..=1.0).contains(&value) || value.is_nan() {
            return Err(ThresholdError::OutOfRange { signal, value });
        }
    }
    Ok(())
}

fn check_strictly_ascending(
    signal: &'static str,
    cutoffs: &[f64; 3],
) -> Result<(), ThresholdError> {
    for i in 0..2 {
        if cutoffs[i] >= cutoffs[i + 1] {
            return Err(ThresholdError::NonMonotonic {
                signal,
                lower_level: LEVEL_NAMES[i],
                lower: cutoffs[i],
                upper_level: LEVEL_NAMES[i + 1],
                upper: cutoffs[i + 1],
                relation: "below",
            });
        }
    }
    Ok(())
}

fn check_strictly_descending(
    signal: &'static str,
    cutoffs: &[f64; 3],
) -> Result<(), ThresholdError> {
    for i in 0..2 {
        if cutoffs[i] <= cutoffs[i + 1] {
            return Err(ThresholdError::NonMonotonic {
                signal,
                lower_level: LEVEL_NAMES[i],
                lower: cutoffs[i],
                upper_level: LEVEL_NAMES[i + 1],
                upper: cutoffs[i + 1],
                relation: "above",
            });
        }
    }
    Ok(())
}
