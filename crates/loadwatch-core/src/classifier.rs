//! Pure worst-signal-wins classification.
//!
//! Each monitored signal votes independently for the highest severity
//! whose cutoff it meets; the overall result is the maximum across all
//! votes. Signals that reach no cutoff contribute
//! [`DegradationLevel::None`]. The function carries no monitoring state
//! and is safely callable standalone.

use std::collections::BTreeMap;

use crate::level::DegradationLevel;
use crate::metrics::{AgentMetrics, SystemMetrics, mean_health_score};
use crate::thresholds::DegradationThresholds;

/// Classify a metrics snapshot against the given thresholds.
///
/// Evaluated signals: `error_rate`, `cpu_utilization`,
/// `memory_utilization`, and (when `agents` is present and non-empty)
/// the arithmetic mean of per-worker `health_score`. A missing or empty
/// worker map excludes the health signal from the vote; it never raises
/// an error.
#[must_use]
pub fn detect_degradation_level(
    thresholds: &DegradationThresholds,
    metrics: &SystemMetrics,
    agents: Option<&BTreeMap<String, AgentMetrics>>,
) -> DegradationLevel {
    let mut level = level_for_excess(
        metrics.error_rate,
        thresholds.moderate_error_rate,
        thresholds.severe_error_rate,
        thresholds.critical_error_rate,
    );

    level = level.max(level_for_excess(
        metrics.cpu_utilization,
        thresholds.moderate_cpu_utilization,
        thresholds.severe_cpu_utilization,
        thresholds.critical_cpu_utilization,
    ));

    level = level.max(level_for_excess(
        metrics.memory_utilization,
        thresholds.moderate_memory_utilization,
        thresholds.severe_memory_utilization,
        thresholds.critical_memory_utilization,
    ));

    if let Some(mean) = agents.and_then(mean_health_score) {
        level = level.max(level_for_shortfall(
            mean,
            thresholds.moderate_agent_health,
            thresholds.severe_agent_health,
            thresholds.critical_agent_health,
        ));
    }

    level
}

/// Highest severity whose cutoff `value` meets or exceeds
/// (higher-is-worse signals).
fn level_for_excess(value: f64, moderate: f64, severe: f64, critical: f64) -> DegradationLevel {
    if value >= critical {
        DegradationLevel::Critical
    } else if value >= severe {
        DegradationLevel::Severe
    } else if value >= moderate {
        DegradationLevel::Moderate
    } else {
        DegradationLevel::None
    }
}

/// Highest severity whose cutoff `value` has fallen below
/// (higher-is-better signals like worker health).
fn level_for_shortfall(value: f64, moderate: f64, severe: f64, critical: f64) -> DegradationLevel {
    if value <= critical {
        DegradationLevel::Critical
    } else if value <= severe {
        DegradationLevel::Severe
    } else if value <= moderate {
        DegradationLevel::Moderate
    } else {
        DegradationLevel::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AgentMetrics;

    fn metrics(error_rate: f64, cpu: f64, memory: f64) -> SystemMetrics {
        SystemMetrics {
            error_rate,
            cpu_utilization: cpu,
            memory_utilization: memory,
            ..SystemMetrics::default()
        }
    }

    fn agents(scores: &[f64]) -> BTreeMap<String, AgentMetrics> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| {
                let id = format!("worker-{i}");
                (id.clone(), AgentMetrics::new(id, score))
            })
            .collect()
    }

    #[test]
    fn healthy_snapshot_is_none() {
        let thresholds = DegradationThresholds::default();
        let level =
            detect_degradation_level(&thresholds, &metrics(0.001, 0.50, 0.60), None);
        assert_eq!(level, DegradationLevel::None);
    }

    #[test]
    fn moderate_snapshot_classifies_moderate() {
        let thresholds = DegradationThresholds::default();
        let level =
            detect_degradation_level(&thresholds, &metrics(0.015, 0.85, 0.87), None);
        assert_eq!(level, DegradationLevel::Moderate);
    }

    #[test]
    fn severe_snapshot_classifies_severe() {
        let thresholds = DegradationThresholds::default();
        let level =
            detect_degradation_level(&thresholds, &metrics(0.06, 0.92, 0.94), None);
        assert_eq!(level, DegradationLevel::Severe);
    }

    #[test]
    fn critical_snapshot_classifies_critical() {
        let thresholds = DegradationThresholds::default();
        let level =
            detect_degradation_level(&thresholds, &metrics(0.12, 0.97, 0.98), None);
        assert_eq!(level, DegradationLevel::Critical);
    }

    #[test]
    fn custom_error_thresholds_respected() {
        let thresholds = DegradationThresholds {
            moderate_error_rate: 0.02,
            severe_error_rate: 0.08,
            critical_error_rate: 0.15,
            ..DegradationThresholds::default()
        }
        .validated()
        .unwrap();
        let level =
            detect_degradation_level(&thresholds, &metrics(0.03, 0.10, 0.10), None);
        assert_eq!(level, DegradationLevel::Moderate);
    }

    #[test]
    fn worst_signal_wins_across_signals() {
        let thresholds = DegradationThresholds::default();
        // Error rate healthy, CPU critical: overall critical.
        let level =
            detect_degradation_level(&thresholds, &metrics(0.0, 0.99, 0.10), None);
        assert_eq!(level, DegradationLevel::Critical);
    }

    #[test]
    fn healthy_workers_do_not_degrade() {
        let thresholds = DegradationThresholds::default();
        let workers = agents(&[0.95, 0.90]);
        let level = detect_degradation_level(
            &thresholds,
            &metrics(0.0, 0.10, 0.10),
            Some(&workers),
        );
        assert_eq!(level, DegradationLevel::None);
    }

    #[test]
    fn unhealthy_worker_mean_escalates() {
        let thresholds = DegradationThresholds::default();
        // Mean health 0.50 falls below the severe cutoff (0.60) but stays
        // above the critical cutoff (0.40).
        let workers = agents(&[0.50, 0.50]);
        let level = detect_degradation_level(
            &thresholds,
            &metrics(0.0, 0.10, 0.10),
            Some(&workers),
        );
        assert_eq!(level, DegradationLevel::Severe);
    }

    #[test]
    fn empty_agent_map_excluded_from_vote() {
        let thresholds = DegradationThresholds::default();
        let empty = BTreeMap::new();
        let level = detect_degradation_level(
            &thresholds,
            &metrics(0.0, 0.10, 0.10),
            Some(&empty),
        );
        assert_eq!(level, DegradationLevel::None);
    }

    #[test]
    fn cutoff_boundary_is_inclusive() {
        let thresholds = DegradationThresholds::default();
        // Exactly at the moderate error cutoff counts as moderate.
        let level =
            detect_degradation_level(&thresholds, &metrics(0.01, 0.0, 0.0), None);
        assert_eq!(level, DegradationLevel::Moderate);
    }

    #[test]
    fn health_boundary_is_inclusive() {
        let thresholds = DegradationThresholds::default();
        // Mean exactly at the moderate health cutoff counts as moderate.
        let workers = agents(&[0.80]);
        let level = detect_degradation_level(
            &thresholds,
            &metrics(0.0, 0.0, 0.0),
            Some(&workers),
        );
        assert_eq!(level, DegradationLevel::Moderate);
    }
}
