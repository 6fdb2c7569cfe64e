//! Rollout phases
//!
//! ```text
//! internal → beta → gradual → stable
//!     └────────┴───────┴────────┴──→ deprecated
//! ```
//!
//! Transitions are operator-driven only; nothing in this crate moves a
//! feature between phases on its own.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stoat_core::StoatError;

/// Current rollout state of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloutPhase {
    /// Never enabled for any tenant
    Internal,
    /// Enabled for whitelisted tenants only
    Beta,
    /// Enabled for a sticky percentage cohort
    Gradual,
    /// Enabled for everyone
    Stable,
    /// Disabled for everyone, regardless of any other setting
    Deprecated,
}

impl RolloutPhase {
    /// The forward progression, excluding `Deprecated`.
    pub const PROGRESSION: [RolloutPhase; 4] = [
        RolloutPhase::Internal,
        RolloutPhase::Beta,
        RolloutPhase::Gradual,
        RolloutPhase::Stable,
    ];

    /// Every phase.
    pub const ALL: [RolloutPhase; 5] = [
        RolloutPhase::Internal,
        RolloutPhase::Beta,
        RolloutPhase::Gradual,
        RolloutPhase::Stable,
        RolloutPhase::Deprecated,
    ];

    /// Wire name of the phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Beta => "beta",
            Self::Gradual => "gradual",
            Self::Stable => "stable",
            Self::Deprecated => "deprecated",
        }
    }

    /// Next phase in the progression; `None` for `Stable` and `Deprecated`.
    pub fn next(self) -> Option<RolloutPhase> {
        let index = Self::PROGRESSION.iter().position(|phase| *phase == self)?;
        Self::PROGRESSION.get(index + 1).copied()
    }

    /// How far through the progression this phase is, in percent.
    /// `Deprecated` counts as finished.
    pub fn progress_percentage(self) -> u8 {
        match Self::PROGRESSION.iter().position(|phase| *phase == self) {
            Some(index) => ((index + 1) * 100 / Self::PROGRESSION.len()) as u8,
            None => 100,
        }
    }

    /// Planned dwell time before moving on, if the phase has a successor.
    pub fn planned_duration(self) -> Option<Duration> {
        match self {
            Self::Internal => Some(Duration::days(7)),
            Self::Beta => Some(Duration::days(14)),
            Self::Gradual => Some(Duration::days(21)),
            Self::Stable | Self::Deprecated => None,
        }
    }
}

impl fmt::Display for RolloutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RolloutPhase {
    type Err = StoatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        RolloutPhase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == normalized)
            .ok_or_else(|| StoatError::invalid(format!("unknown rollout phase '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_any_case() {
        assert_eq!("GRADUAL".parse::<RolloutPhase>().unwrap(), RolloutPhase::Gradual);
        assert_eq!(" beta".parse::<RolloutPhase>().unwrap(), RolloutPhase::Beta);
        let err = "alpha".parse::<RolloutPhase>().unwrap_err();
        assert!(err.is_invalid());
    }

    #[test]
    fn progression() {
        assert_eq!(RolloutPhase::Internal.next(), Some(RolloutPhase::Beta));
        assert_eq!(RolloutPhase::Gradual.next(), Some(RolloutPhase::Stable));
        assert_eq!(RolloutPhase::Stable.next(), None);
        assert_eq!(RolloutPhase::Deprecated.next(), None);
    }

    #[test]
    fn progress_percentages() {
        let progress: Vec<u8> = RolloutPhase::ALL
            .iter()
            .map(|phase| phase.progress_percentage())
            .collect();
        assert_eq!(progress, vec![25, 50, 75, 100, 100]);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&RolloutPhase::Deprecated).unwrap();
        assert_eq!(json, "\"deprecated\"");
    }
}
