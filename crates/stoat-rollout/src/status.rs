//! Operator-facing rollout reports

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::flag::FeatureFlag;
use crate::phase::RolloutPhase;

/// Summary of one feature's rollout state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureStatus {
    /// Feature name
    pub feature: String,
    /// Current phase
    pub phase: RolloutPhase,
    /// Share of tenants reached: configured value when gradual, 100 when
    /// stable, 0 otherwise.
    pub percentage: u8,
    /// Number of whitelisted tenants
    pub whitelisted: usize,
    /// Number of blacklisted tenants
    pub blacklisted: usize,
}

impl FeatureStatus {
    /// Status of `flag` registered as `feature`.
    pub fn of(feature: &str, flag: &FeatureFlag) -> Self {
        Self {
            feature: feature.to_owned(),
            phase: flag.phase,
            percentage: flag.effective_percentage(),
            whitelisted: flag.whitelist.len(),
            blacklisted: flag.blacklist.len(),
        }
    }

    /// Status reported for a feature nobody registered.
    pub fn unknown(feature: &str) -> Self {
        Self::of(feature, &FeatureFlag::internal())
    }
}

/// Position of a feature in the phase progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseProgress {
    /// Feature name
    pub feature: String,
    /// Current phase
    pub phase: RolloutPhase,
    /// Share of the progression completed
    pub progress_percentage: u8,
    /// Following phase, if any
    pub next_phase: Option<RolloutPhase>,
    /// Planned date for the next phase, counted from the report time.
    pub eta: Option<DateTime<Utc>>,
}

impl PhaseProgress {
    /// Progress of `feature` in `phase`, as seen at `now`.
    pub fn of(feature: &str, phase: RolloutPhase, now: DateTime<Utc>) -> Self {
        Self {
            feature: feature.to_owned(),
            phase,
            progress_percentage: phase.progress_percentage(),
            next_phase: phase.next(),
            eta: phase.planned_duration().map(|duration| now + duration),
        }
    }
}
