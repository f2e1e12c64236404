//! Ordered degradation severity scale.
//!
//! The ladder is intentionally monotonic in severity:
//! 1. `None` - all monitored signals within healthy bounds.
//! 2. `Moderate` - early warning; at least one signal past its first cutoff.
//! 3. `Severe` - sustained pressure; mitigation strategies should engage.
//! 4. `Critical` - the system is at risk of collapse under current load.

use serde::{Deserialize, Serialize};

/// One point on the ordered severity scale describing overall system health.
///
/// Severity comparisons reduce to numeric comparisons (`None < Moderate <
/// Severe < Critical`), so worst-signal-wins aggregation is a plain `max`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DegradationLevel {
    /// No degradation detected.
    #[default]
    None,
    /// Early degradation; reduced headroom but service intact.
    Moderate,
    /// Significant degradation; mitigation expected.
    Severe,
    /// Imminent failure territory.
    Critical,
}

/// All levels, in ascending severity order.
pub const ALL_LEVELS: [DegradationLevel; 4] = [
    DegradationLevel::None,
    DegradationLevel::Moderate,
    DegradationLevel::Severe,
    DegradationLevel::Critical,
];

impl DegradationLevel {
    /// Severity rank for telemetry sorting and quick comparisons.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Moderate => 1,
            Self::Severe => 2,
            Self::Critical => 3,
        }
    }

    /// `true` for every level except [`DegradationLevel::None`].
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Moderate => write!(f, "moderate"),
            Self::Severe => write!(f, "severe"),
            Self::Critical => write!(f, "critical"),
        }
    }
}
