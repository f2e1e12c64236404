//! Degradation transition audit records.

use serde::{Deserialize, Serialize};

use crate::level::DegradationLevel;
use crate::metrics::SystemMetrics;

/// Whether a transition entered a degradation level or recovered to
/// healthy operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// A non-`None` level was entered (first degradation or movement
    /// between degraded levels).
    Entered,
    /// The system returned to [`DegradationLevel::None`].
    Recovered,
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entered => write!(f, "entered"),
            Self::Recovered => write!(f, "recovered"),
        }
    }
}

/// One recorded transition, immutable once appended to the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationEvent {
    /// Level in effect after this transition.
    pub level: DegradationLevel,
    /// Epoch ms when the transition was observed.
    pub timestamp_ms: u64,
    /// Entered vs. recovered.
    pub transition: TransitionKind,
    /// Snapshot that triggered the transition, carried for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SystemMetrics>,
}

impl DegradationEvent {
    /// Build an `entered` event for a level.
    #[must_use]
    pub fn entered(level: DegradationLevel, timestamp_ms: u64) -> Self {
        Self {
            level,
            timestamp_ms,
            transition: TransitionKind::Entered,
            snapshot: None,
        }
    }

    /// Build a `recovered` event.
    #[must_use]
    pub fn recovered(timestamp_ms: u64) -> Self {
        Self {
            level: DegradationLevel::None,
            timestamp_ms,
            transition: TransitionKind::Recovered,
            snapshot: None,
        }
    }

    /// Attach the triggering snapshot.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: SystemMetrics) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}
