//! Error types for loadwatch-core.
//!
//! Only genuine configuration and lifecycle-misuse errors propagate to
//! callers. Everything encountered inside the live polling loop (provider
//! failures, callback panics) is recovered locally so the monitor stays
//! alive through the conditions it exists to observe.

use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for loadwatch-core.
#[derive(Error, Debug)]
pub enum Error {
    /// Threshold configuration errors.
    #[error("threshold error: {0}")]
    Threshold(#[from] ThresholdError),

    /// Monitoring lifecycle misuse.
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// Metrics provider boundary failures.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Malformed or inconsistent [`DegradationThresholds`].
///
/// [`DegradationThresholds`]: crate::thresholds::DegradationThresholds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    /// Cutoffs for a signal do not escalate with severity.
    #[error(
        "non-monotonic {signal} thresholds: {lower_level} cutoff {lower} must be \
         {relation} {upper_level} cutoff {upper}"
    )]
    NonMonotonic {
        /// Signal whose cutoffs are inconsistent.
        signal: &'static str,
        /// The less severe of the two offending levels.
        lower_level: &'static str,
        /// Cutoff configured for `lower_level`.
        lower: f64,
        /// The more severe of the two offending levels.
        upper_level: &'static str,
        /// Cutoff configured for `upper_level`.
        upper: f64,
        /// Required ordering ("below" for higher-is-worse signals,
        /// "above" for higher-is-better signals).
        relation: &'static str,
    },

    /// A cutoff is outside its documented domain (rates and utilizations
    /// are fractions in `[0.0, 1.0]`).
    #[error("{signal} cutoff {value} is outside [0.0, 1.0]")]
    OutOfRange {
        /// Signal with the out-of-range cutoff.
        signal: &'static str,
        /// The offending value.
        value: f64,
    },
}

/// Monitoring lifecycle misuse.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorError {
    /// `start_monitoring` was called while the polling loop is running.
    #[error("monitor is already running; call stop_monitoring first")]
    AlreadyRunning,
}

/// A metrics provider failed to produce a snapshot for a tick.
///
/// Providers are external collaborators; the monitor treats these as soft
/// failures, skipping the tick and retrying on the next interval.
#[derive(Error, Debug, Clone)]
#[error("metrics provider failure: {0}")]
pub struct ProviderError(String);

impl ProviderError {
    /// Wrap a provider failure description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for ProviderError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ProviderError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_error_message_names_signal_and_levels() {
        let err = ThresholdError::NonMonotonic {
            signal: "error_rate",
            lower_level: "moderate",
            lower: 0.5,
            upper_level: "severe",
            upper: 0.1,
            relation: "below",
        };
        let msg = err.to_string();
        assert!(msg.contains("error_rate"));
        assert!(msg.contains("moderate"));
        assert!(msg.contains("severe"));
    }

    #[test]
    fn provider_error_from_str() {
        let err = ProviderError::from("connection reset");
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn lifecycle_error_wraps_into_crate_error() {
        let err: Error = MonitorError::AlreadyRunning.into();
        assert!(matches!(err, Error::Monitor(MonitorError::AlreadyRunning)));
    }
}
