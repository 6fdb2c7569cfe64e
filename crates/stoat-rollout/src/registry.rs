//! Immutable feature registry snapshots

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stoat_core::TenantId;

use crate::decision::RolloutDecision;
use crate::flag::FeatureFlag;

/// All known features, keyed by name.
///
/// The controller never mutates a registry that readers can see: updates
/// clone the current snapshot, edit the copy, and swap it in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RolloutRegistry {
    features: BTreeMap<String, FeatureFlag>,
}

impl RolloutRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register `feature`, replacing any previous entry.
    pub fn with_feature(mut self, feature: impl Into<String>, flag: FeatureFlag) -> Self {
        self.insert(feature, flag);
        self
    }

    /// Flag registered under `feature`.
    pub fn get(&self, feature: &str) -> Option<&FeatureFlag> {
        self.features.get(feature)
    }

    /// Mutable flag registered under `feature`.
    pub fn get_mut(&mut self, feature: &str) -> Option<&mut FeatureFlag> {
        self.features.get_mut(feature)
    }

    /// Register or replace a feature, returning the previous flag.
    pub fn insert(&mut self, feature: impl Into<String>, flag: FeatureFlag) -> Option<FeatureFlag> {
        self.features.insert(feature.into(), flag)
    }

    /// The flag for `feature`, registering an internal placeholder if absent.
    pub fn entry(&mut self, feature: &str) -> &mut FeatureFlag {
        self.features
            .entry(feature.to_owned())
            .or_insert_with(FeatureFlag::internal)
    }

    /// Whether `feature` is registered.
    pub fn contains(&self, feature: &str) -> bool {
        self.features.contains_key(feature)
    }

    /// Number of registered features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether no feature is registered.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureFlag)> {
        self.features.iter().map(|(name, flag)| (name.as_str(), flag))
    }

    /// Evaluate `feature` for `tenant`; unknown features are disabled.
    pub fn evaluate(&self, feature: &str, tenant: &TenantId) -> RolloutDecision {
        match self.features.get(feature) {
            Some(flag) => flag.evaluate(feature, tenant),
            None => RolloutDecision::UnknownFeature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::RolloutPhase;

    #[test]
    fn unknown_features_are_disabled() {
        let registry = RolloutRegistry::new();
        let decision = registry.evaluate("teleport", &TenantId::new("guild-1"));
        assert_eq!(decision, RolloutDecision::UnknownFeature);
        assert!(!decision.is_enabled());
    }

    #[test]
    fn entry_registers_internal_placeholder() {
        let mut registry = RolloutRegistry::new();
        registry.entry("teleport").whitelist.insert(TenantId::new("guild-1"));
        let flag = registry.get("teleport").unwrap();
        assert_eq!(flag.phase, RolloutPhase::Internal);
        assert_eq!(flag.whitelist.len(), 1);
    }

    #[test]
    fn iteration_is_name_ordered() {
        let registry = RolloutRegistry::new()
            .with_feature("zeta", FeatureFlag::internal())
            .with_feature("alpha", FeatureFlag::internal());
        let names: Vec<_> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
