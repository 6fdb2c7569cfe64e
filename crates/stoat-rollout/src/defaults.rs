//! Feature table installed at process start

use crate::flag::FeatureFlag;
use crate::phase::RolloutPhase;
use crate::registry::RolloutRegistry;

/// `(feature, phase, percentage)` for every built-in feature.
pub const DEFAULT_FEATURES: [(&str, RolloutPhase, u8); 9] = [
    ("core_features", RolloutPhase::Stable, 0),
    ("verification", RolloutPhase::Stable, 0),
    ("moderation", RolloutPhase::Stable, 0),
    ("economy", RolloutPhase::Gradual, 50),
    ("leveling", RolloutPhase::Gradual, 50),
    ("tickets", RolloutPhase::Beta, 25),
    ("giveaways", RolloutPhase::Beta, 25),
    ("social_alerts", RolloutPhase::Internal, 5),
    ("ai_chat", RolloutPhase::Internal, 10),
];

/// Registry holding [`DEFAULT_FEATURES`] with empty override lists.
pub fn default_registry() -> RolloutRegistry {
    DEFAULT_FEATURES
        .iter()
        .fold(RolloutRegistry::new(), |registry, (name, phase, percentage)| {
            registry.with_feature(*name, FeatureFlag::new(*phase).with_percentage(*percentage))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoat_core::TenantId;

    #[test]
    fn default_table() {
        let registry = default_registry();
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.get("economy").unwrap().percentage, 50);
        assert_eq!(registry.get("tickets").unwrap().phase, RolloutPhase::Beta);

        let tenant = TenantId::new("guild-1");
        assert!(registry.evaluate("moderation", &tenant).is_enabled());
        assert!(!registry.evaluate("ai_chat", &tenant).is_enabled());
        assert!(!registry.evaluate("tickets", &tenant).is_enabled());
    }
}
