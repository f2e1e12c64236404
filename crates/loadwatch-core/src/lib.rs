//! loadwatch-core: adaptive degradation detection and response.
//!
//! A long-running monitor samples health signals from a system under
//! load, classifies overall health onto an ordered severity scale, and
//! dispatches level-specific mitigation callbacks exactly on transition,
//! keeping an auditable history of degradation and recovery episodes.
//!
//! # Architecture
//!
//! ```text
//! MetricsProvider ──► Monitor tick ──► Classifier ──► level change?
//!                                                         │ yes
//!                               StrategyRegistry ◄────────┤
//!                               history / counters ◄──────┘
//! ```
//!
//! # Modules
//!
//! - `level`: ordered degradation severity scale
//! - `metrics`: snapshot types and the metrics-provider boundary
//! - `thresholds`: per-signal, per-level classification cutoffs
//! - `classifier`: pure worst-signal-wins classification
//! - `event`: transition audit records
//! - `strategy`: per-level mitigation callback registry
//! - `monitor`: polling loop, lifecycle, and statistics
//! - `logging`: tracing subscriber initialization
//! - `error`: error taxonomy
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod classifier;
pub mod error;
pub mod event;
pub mod level;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod strategy;
pub mod thresholds;

pub use classifier::detect_degradation_level;
pub use error::{Error, MonitorError, ProviderError, Result, ThresholdError};
pub use event::{DegradationEvent, TransitionKind};
pub use level::DegradationLevel;
pub use metrics::{AgentMetrics, FnProvider, MetricsProvider, MetricsSample, SystemMetrics};
pub use monitor::{DegradationMonitor, MonitorConfig, MonitorStatistics};
pub use strategy::{StrategyCallback, StrategyRegistry};
pub use thresholds::DegradationThresholds;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
