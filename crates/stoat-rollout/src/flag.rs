//! Per-feature rollout configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use stoat_core::TenantId;

use crate::bucket::{bucket, in_cohort};
use crate::decision::RolloutDecision;
use crate::phase::RolloutPhase;

/// Highest accepted rollout percentage.
pub const MAX_PERCENTAGE: u8 = 100;

/// Rollout state of a single feature.
///
/// `percentage` only matters in [`RolloutPhase::Gradual`] and `whitelist`
/// only in [`RolloutPhase::Beta`]; the blacklist applies in every phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlag {
    /// Current rollout phase
    pub phase: RolloutPhase,
    /// Gradual cohort size, `0..=100`
    #[serde(default)]
    pub percentage: u8,
    /// Tenants enabled while in beta
    #[serde(default)]
    pub whitelist: BTreeSet<TenantId>,
    /// Tenants disabled in every phase
    #[serde(default)]
    pub blacklist: BTreeSet<TenantId>,
    /// Operator-facing description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FeatureFlag {
    /// A flag in `phase` with no overrides and a zero percentage.
    pub fn new(phase: RolloutPhase) -> Self {
        Self {
            phase,
            percentage: 0,
            whitelist: BTreeSet::new(),
            blacklist: BTreeSet::new(),
            description: None,
        }
    }

    /// Placeholder registered when an override targets an unknown feature.
    pub fn internal() -> Self {
        Self::new(RolloutPhase::Internal)
    }

    /// Builder: set the rollout percentage, clamped to `0..=100`.
    pub fn with_percentage(mut self, percentage: u8) -> Self {
        self.percentage = percentage.min(MAX_PERCENTAGE);
        self
    }

    /// Builder: attach a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder: whitelist a tenant.
    pub fn whitelisting(mut self, tenant: impl Into<TenantId>) -> Self {
        self.whitelist.insert(tenant.into());
        self
    }

    /// Builder: blacklist a tenant.
    pub fn blacklisting(mut self, tenant: impl Into<TenantId>) -> Self {
        self.blacklist.insert(tenant.into());
        self
    }

    /// Percentage of tenants the flag currently reaches, ignoring overrides.
    pub fn effective_percentage(&self) -> u8 {
        match self.phase {
            RolloutPhase::Gradual => self.percentage,
            RolloutPhase::Stable => MAX_PERCENTAGE,
            _ => 0,
        }
    }

    /// Tenants present on both lists. The blacklist wins for them.
    pub fn conflicting_overrides(&self) -> impl Iterator<Item = &TenantId> {
        self.whitelist.intersection(&self.blacklist)
    }

    /// Evaluate the flag for `tenant`.
    ///
    /// First match wins: blacklist, deprecated, stable, beta whitelist,
    /// gradual cohort, internal.
    pub fn evaluate(&self, feature: &str, tenant: &TenantId) -> RolloutDecision {
        if self.blacklist.contains(tenant) {
            return RolloutDecision::Blacklisted;
        }
        match self.phase {
            RolloutPhase::Deprecated => RolloutDecision::Deprecated,
            RolloutPhase::Stable => RolloutDecision::Stable,
            RolloutPhase::Beta if self.whitelist.contains(tenant) => RolloutDecision::Whitelisted,
            RolloutPhase::Beta => RolloutDecision::NotWhitelisted,
            RolloutPhase::Gradual => {
                let bucket = bucket(tenant, feature);
                if in_cohort(bucket, self.percentage) {
                    RolloutDecision::InCohort {
                        bucket,
                        percentage: self.percentage,
                    }
                } else {
                    RolloutDecision::OutsideCohort {
                        bucket,
                        percentage: self.percentage,
                    }
                }
            }
            RolloutPhase::Internal => RolloutDecision::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id)
    }

    #[test]
    fn blacklist_beats_every_phase() {
        for phase in RolloutPhase::ALL {
            let flag = FeatureFlag::new(phase)
                .with_percentage(100)
                .whitelisting("guild-1")
                .blacklisting("guild-1");
            assert_eq!(
                flag.evaluate("economy", &tenant("guild-1")),
                RolloutDecision::Blacklisted,
                "phase {phase}"
            );
        }
    }

    #[test]
    fn whitelist_only_counts_in_beta() {
        let flag = FeatureFlag::new(RolloutPhase::Internal).whitelisting("guild-1");
        assert!(!flag.evaluate("tickets", &tenant("guild-1")).is_enabled());

        let flag = FeatureFlag {
            phase: RolloutPhase::Beta,
            ..flag
        };
        assert!(flag.evaluate("tickets", &tenant("guild-1")).is_enabled());
        assert!(!flag.evaluate("tickets", &tenant("guild-2")).is_enabled());
    }

    #[test]
    fn gradual_uses_the_bucket() {
        // guild-1/economy sits in bucket 94, guild-2/economy in 75.
        let flag = FeatureFlag::new(RolloutPhase::Gradual).with_percentage(80);
        assert_eq!(
            flag.evaluate("economy", &tenant("guild-2")),
            RolloutDecision::InCohort {
                bucket: 75,
                percentage: 80
            }
        );
        assert_eq!(
            flag.evaluate("economy", &tenant("guild-1")),
            RolloutDecision::OutsideCohort {
                bucket: 94,
                percentage: 80
            }
        );
    }

    #[test]
    fn percentage_is_clamped() {
        let flag = FeatureFlag::new(RolloutPhase::Gradual).with_percentage(250);
        assert_eq!(flag.percentage, 100);
    }

    #[test]
    fn effective_percentage_by_phase() {
        let flag = FeatureFlag::new(RolloutPhase::Gradual).with_percentage(40);
        assert_eq!(flag.effective_percentage(), 40);
        assert_eq!(
            FeatureFlag::new(RolloutPhase::Stable).with_percentage(40).effective_percentage(),
            100
        );
        assert_eq!(
            FeatureFlag::new(RolloutPhase::Beta).with_percentage(40).effective_percentage(),
            0
        );
    }

    #[test]
    fn conflicting_overrides_are_listed() {
        let flag = FeatureFlag::internal()
            .whitelisting("a")
            .whitelisting("b")
            .blacklisting("b");
        let conflicts: Vec<_> = flag.conflicting_overrides().cloned().collect();
        assert_eq!(conflicts, vec![tenant("b")]);
    }
}
