//! Rollout decisions with the rule that produced them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of evaluating a feature for a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RolloutDecision {
    /// Tenant is on the feature's blacklist
    Blacklisted,
    /// Feature is deprecated
    Deprecated,
    /// Feature is stable
    Stable,
    /// Beta feature, tenant whitelisted
    Whitelisted,
    /// Beta feature, tenant not whitelisted
    NotWhitelisted,
    /// Gradual feature, tenant's bucket is below the percentage
    InCohort {
        /// Tenant's bucket
        bucket: u8,
        /// Configured percentage
        percentage: u8,
    },
    /// Gradual feature, tenant's bucket is at or above the percentage
    OutsideCohort {
        /// Tenant's bucket
        bucket: u8,
        /// Configured percentage
        percentage: u8,
    },
    /// Feature is internal only
    Internal,
    /// No such feature registered; treated as internal
    UnknownFeature,
}

impl RolloutDecision {
    /// Whether the feature is active for the tenant.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Stable | Self::Whitelisted | Self::InCohort { .. })
    }
}

impl fmt::Display for RolloutDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blacklisted => f.write_str("tenant blacklisted"),
            Self::Deprecated => f.write_str("feature deprecated"),
            Self::Stable => f.write_str("feature stable"),
            Self::Whitelisted => f.write_str("tenant whitelisted for beta"),
            Self::NotWhitelisted => f.write_str("tenant not whitelisted for beta"),
            Self::InCohort { bucket, percentage } => {
                write!(f, "bucket {bucket} inside {percentage}% cohort")
            }
            Self::OutsideCohort { bucket, percentage } => {
                write!(f, "bucket {bucket} outside {percentage}% cohort")
            }
            Self::Internal => f.write_str("feature internal"),
            Self::UnknownFeature => f.write_str("unknown feature"),
        }
    }
}
