//! Rollout controller
//!
//! Owns the feature registry. Reads take an `Arc` snapshot under a brief
//! read lock and evaluate without holding it; writes clone the snapshot,
//! apply the change to the copy and swap it in under the write lock, so a
//! reader sees either the whole change or none of it.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use stoat_core::{StoatResult, TenantId, INTEGRITY_TARGET};
use tracing::{debug, info, warn};

use crate::decision::RolloutDecision;
use crate::defaults::default_registry;
use crate::flag::MAX_PERCENTAGE;
use crate::phase::RolloutPhase;
use crate::registry::RolloutRegistry;
use crate::status::{FeatureStatus, PhaseProgress};

/// Decides which tenants may use which features.
#[derive(Debug)]
pub struct RolloutController {
    registry: RwLock<Arc<RolloutRegistry>>,
}

impl Default for RolloutController {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RolloutController {
    /// Controller over `registry`.
    pub fn new(registry: RolloutRegistry) -> Self {
        Self {
            registry: RwLock::new(Arc::new(registry)),
        }
    }

    /// Controller seeded with the built-in feature table.
    pub fn with_defaults() -> Self {
        Self::new(default_registry())
    }

    /// Current registry. Later updates do not affect the returned snapshot.
    pub fn snapshot(&self) -> Arc<RolloutRegistry> {
        Arc::clone(&*self.registry.read())
    }

    /// Evaluate `feature` for `tenant`, explaining the outcome.
    pub fn evaluate(&self, feature: &str, tenant: &TenantId) -> RolloutDecision {
        let decision = self.snapshot().evaluate(feature, tenant);
        if decision == RolloutDecision::UnknownFeature {
            warn!(target: INTEGRITY_TARGET, feature, %tenant, "unknown feature flag; treating as disabled");
        } else {
            debug!(feature, %tenant, %decision, "rollout decision");
        }
        decision
    }

    /// Is `feature` active for `tenant`?
    pub fn is_feature_enabled(&self, feature: &str, tenant: &TenantId) -> bool {
        self.evaluate(feature, tenant).is_enabled()
    }

    /// Apply `change` to a copy of the registry and publish it if `change`
    /// succeeds. On error the published registry is left as it was.
    pub fn update<T>(
        &self,
        change: impl FnOnce(&mut RolloutRegistry) -> StoatResult<T>,
    ) -> StoatResult<T> {
        let mut published = self.registry.write();
        let mut next = RolloutRegistry::clone(&published);
        let output = change(&mut next)?;
        *published = Arc::new(next);
        Ok(output)
    }

    /// Replace the whole registry.
    pub fn replace(&self, registry: RolloutRegistry) {
        *self.registry.write() = Arc::new(registry);
        info!(features = self.snapshot().len(), "rollout registry replaced");
    }

    /// Move `feature` to `phase`, registering it if unknown.
    pub fn set_phase(&self, feature: &str, phase: RolloutPhase) {
        self.mutate(|registry| registry.entry(feature).phase = phase);
        info!(feature, %phase, "feature phase set");
    }

    /// Set the gradual percentage, clamped to `0..=100`. Returns the value
    /// actually stored.
    pub fn set_rollout_percentage(&self, feature: &str, percentage: i64) -> u8 {
        let clamped = percentage.clamp(0, i64::from(MAX_PERCENTAGE)) as u8;
        self.mutate(|registry| registry.entry(feature).percentage = clamped);
        info!(feature, requested = percentage, percentage = clamped, "feature rollout percentage set");
        clamped
    }

    /// Whitelist `tenant` for `feature`, registering the feature if unknown.
    pub fn add_whitelist(&self, feature: &str, tenant: &TenantId) {
        self.mutate(|registry| {
            registry.entry(feature).whitelist.insert(tenant.clone());
        });
        info!(feature, %tenant, "tenant whitelisted");
    }

    /// Remove `tenant` from the whitelist. No-op for unknown features.
    pub fn remove_whitelist(&self, feature: &str, tenant: &TenantId) {
        self.mutate(|registry| {
            if let Some(flag) = registry.get_mut(feature) {
                flag.whitelist.remove(tenant);
            }
        });
        info!(feature, %tenant, "tenant removed from whitelist");
    }

    /// Blacklist `tenant` for `feature`, registering the feature if unknown.
    pub fn add_blacklist(&self, feature: &str, tenant: &TenantId) {
        self.mutate(|registry| {
            registry.entry(feature).blacklist.insert(tenant.clone());
        });
        info!(feature, %tenant, "tenant blacklisted");
    }

    /// Remove `tenant` from the blacklist. No-op for unknown features.
    pub fn remove_blacklist(&self, feature: &str, tenant: &TenantId) {
        self.mutate(|registry| {
            if let Some(flag) = registry.get_mut(feature) {
                flag.blacklist.remove(tenant);
            }
        });
        info!(feature, %tenant, "tenant removed from blacklist");
    }

    /// Status of one feature; unknown features report as internal.
    pub fn feature_status(&self, feature: &str) -> FeatureStatus {
        match self.snapshot().get(feature) {
            Some(flag) => FeatureStatus::of(feature, flag),
            None => FeatureStatus::unknown(feature),
        }
    }

    /// Status of every registered feature, in name order.
    pub fn all_feature_statuses(&self) -> Vec<FeatureStatus> {
        self.snapshot()
            .iter()
            .map(|(feature, flag)| FeatureStatus::of(feature, flag))
            .collect()
    }

    /// Phase progress of every registered feature, with ETAs counted from `now`.
    pub fn phase_progress(&self, now: DateTime<Utc>) -> Vec<PhaseProgress> {
        self.snapshot()
            .iter()
            .map(|(feature, flag)| PhaseProgress::of(feature, flag.phase, now))
            .collect()
    }

    fn mutate(&self, change: impl FnOnce(&mut RolloutRegistry)) {
        let mut published = self.registry.write();
        let mut next = RolloutRegistry::clone(&published);
        change(&mut next);
        *published = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoat_core::StoatError;

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id)
    }

    /// Collects formatted log output.
    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn warnings_during(action: impl FnOnce()) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, action);
        let bytes = captured.0.lock().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn unknown_features_warn_on_the_integrity_target() {
        let controller = RolloutController::with_defaults();
        let logs = warnings_during(|| {
            let decision = controller.evaluate("ecnomy", &tenant("guild-1"));
            assert_eq!(decision, RolloutDecision::UnknownFeature);
        });
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains(INTEGRITY_TARGET), "{logs}");
        assert!(logs.contains("ecnomy"), "{logs}");

        let logs = warnings_during(|| {
            assert!(controller.is_feature_enabled("moderation", &tenant("guild-1")));
        });
        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn percentage_is_clamped() {
        let controller = RolloutController::with_defaults();
        assert_eq!(controller.set_rollout_percentage("economy", 150), 100);
        assert_eq!(controller.set_rollout_percentage("economy", -5), 0);
        assert_eq!(controller.snapshot().get("economy").unwrap().percentage, 0);
    }

    #[test]
    fn whitelist_then_blacklist_disables() {
        let controller = RolloutController::with_defaults();
        let guild = tenant("guild-7");

        controller.add_whitelist("tickets", &guild);
        assert!(controller.is_feature_enabled("tickets", &guild));

        controller.add_blacklist("tickets", &guild);
        assert_eq!(controller.evaluate("tickets", &guild), RolloutDecision::Blacklisted);

        controller.remove_blacklist("tickets", &guild);
        assert!(controller.is_feature_enabled("tickets", &guild));
    }

    #[test]
    fn overrides_register_unknown_features_as_internal() {
        let controller = RolloutController::new(RolloutRegistry::new());
        controller.add_whitelist("teleport", &tenant("guild-1"));
        let status = controller.feature_status("teleport");
        assert_eq!(status.phase, RolloutPhase::Internal);
        assert_eq!(status.whitelisted, 1);

        controller.remove_blacklist("warp", &tenant("guild-1"));
        assert!(!controller.snapshot().contains("warp"));
    }

    #[test]
    fn snapshots_are_isolated_from_later_updates() {
        let controller = RolloutController::with_defaults();
        let before = controller.snapshot();
        controller.set_phase("economy", RolloutPhase::Deprecated);
        assert_eq!(before.get("economy").unwrap().phase, RolloutPhase::Gradual);
        assert_eq!(
            controller.snapshot().get("economy").unwrap().phase,
            RolloutPhase::Deprecated
        );
    }

    #[test]
    fn failed_update_publishes_nothing() {
        let controller = RolloutController::with_defaults();
        let before = controller.snapshot();
        let result: StoatResult<()> = controller.update(|registry| {
            registry.entry("economy").percentage = 99;
            Err(StoatError::invalid("rejected"))
        });
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &controller.snapshot()));
    }

    #[test]
    fn statuses_cover_every_feature() {
        let controller = RolloutController::with_defaults();
        let statuses = controller.all_feature_statuses();
        assert_eq!(statuses.len(), 9);
        let economy = statuses.iter().find(|s| s.feature == "economy").unwrap();
        assert_eq!(economy.percentage, 50);
        let tickets = statuses.iter().find(|s| s.feature == "tickets").unwrap();
        assert_eq!(tickets.percentage, 0);

        let progress = controller.phase_progress(Utc::now());
        assert_eq!(progress.len(), 9);
    }
}
