//! Management surface for operator tooling
//!
//! Every mutation goes through [`RolloutController`]; nothing here holds the
//! registry directly.
//!
//! # Document format
//!
//! ```json
//! {
//!   "phases": { "economy": "gradual" },
//!   "percentages": { "economy": 50 },
//!   "whitelist": { "economy": ["guild-1"] },
//!   "blacklist": { "economy": [] },
//!   "exported_at": "2025-01-01T00:00:00+00:00"
//! }
//! ```
//!
//! Import overlays the document on the current registry: features it does
//! not mention keep their state, and listed override sets replace the
//! current ones. A document with any invalid entry is rejected whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use stoat_core::{StoatError, StoatResult, TenantId};
use tracing::{info, warn};

use crate::controller::RolloutController;
use crate::flag::MAX_PERCENTAGE;
use crate::phase::RolloutPhase;

/// Serialized form of the rollout registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutDocument {
    /// Phase name per feature
    #[serde(default)]
    pub phases: BTreeMap<String, String>,
    /// Gradual percentage per feature
    #[serde(default)]
    pub percentages: BTreeMap<String, i64>,
    /// Whitelisted tenants per feature
    #[serde(default)]
    pub whitelist: BTreeMap<String, Vec<TenantId>>,
    /// Blacklisted tenants per feature
    #[serde(default)]
    pub blacklist: BTreeMap<String, Vec<TenantId>>,
    /// ISO-8601 export time; ignored on import.
    #[serde(default)]
    pub exported_at: String,
}

/// Operator operations over a shared [`RolloutController`].
#[derive(Debug, Clone)]
pub struct PolicyAdmin {
    controller: Arc<RolloutController>,
}

impl PolicyAdmin {
    /// Surface over `controller`.
    pub fn new(controller: Arc<RolloutController>) -> Self {
        Self { controller }
    }

    /// The controller all mutations go through.
    pub fn controller(&self) -> &Arc<RolloutController> {
        &self.controller
    }

    /// Set the phase from its wire name. Unknown names are rejected and
    /// leave the feature unchanged.
    pub fn set_phase(&self, feature: &str, phase: &str) -> StoatResult<RolloutPhase> {
        let phase = phase
            .parse::<RolloutPhase>()
            .map_err(|err| err.with_context(format!("feature '{feature}'")))?;
        self.controller.set_phase(feature, phase);
        Ok(phase)
    }

    /// Set the gradual percentage; out-of-range values are clamped.
    pub fn set_percentage(&self, feature: &str, percentage: i64) -> u8 {
        self.controller.set_rollout_percentage(feature, percentage)
    }

    /// Whitelist `tenant`, registering unknown features as internal.
    pub fn whitelist_add(&self, feature: &str, tenant: &TenantId) {
        self.controller.add_whitelist(feature, tenant);
    }

    /// Drop `tenant` from the whitelist.
    pub fn whitelist_remove(&self, feature: &str, tenant: &TenantId) {
        self.controller.remove_whitelist(feature, tenant);
    }

    /// Blacklist `tenant`, registering unknown features as internal.
    pub fn blacklist_add(&self, feature: &str, tenant: &TenantId) {
        self.controller.add_blacklist(feature, tenant);
    }

    /// Drop `tenant` from the blacklist.
    pub fn blacklist_remove(&self, feature: &str, tenant: &TenantId) {
        self.controller.remove_blacklist(feature, tenant);
    }

    /// Snapshot the registry as a document stamped with `at`.
    pub fn document_at(&self, at: DateTime<Utc>) -> RolloutDocument {
        let registry = self.controller.snapshot();
        let mut document = RolloutDocument {
            exported_at: at.to_rfc3339(),
            ..RolloutDocument::default()
        };
        for (feature, flag) in registry.iter() {
            document
                .phases
                .insert(feature.to_owned(), flag.phase.as_str().to_owned());
            document
                .percentages
                .insert(feature.to_owned(), i64::from(flag.percentage));
            document
                .whitelist
                .insert(feature.to_owned(), flag.whitelist.iter().cloned().collect());
            document
                .blacklist
                .insert(feature.to_owned(), flag.blacklist.iter().cloned().collect());
        }
        document
    }

    /// Export the registry as pretty-printed JSON, stamped now.
    pub fn export(&self) -> StoatResult<String> {
        self.export_at(Utc::now())
    }

    /// Export the registry as pretty-printed JSON, stamped with `at`.
    pub fn export_at(&self, at: DateTime<Utc>) -> StoatResult<String> {
        let json = serde_json::to_string_pretty(&self.document_at(at))?;
        Ok(json)
    }

    /// Import a JSON document. Returns the number of features it touched.
    pub fn import(&self, json: &str) -> StoatResult<usize> {
        let result = serde_json::from_str::<RolloutDocument>(json)
            .map_err(|err| StoatError::invalid(format!("malformed rollout document: {err}")))
            .and_then(|document| self.import_document(document));
        match &result {
            Ok(features) => info!(features, "rollout document imported"),
            Err(err) => warn!(error = %err, "rollout document rejected"),
        }
        result
    }

    /// Import a parsed document with the same all-or-nothing semantics as
    /// [`PolicyAdmin::import`].
    pub fn import_document(&self, document: RolloutDocument) -> StoatResult<usize> {
        let overlay = Overlay::validate(document)?;
        self.controller.update(|registry| {
            for (feature, phase) in &overlay.phases {
                registry.entry(feature).phase = *phase;
            }
            for (feature, percentage) in &overlay.percentages {
                registry.entry(feature).percentage = *percentage;
            }
            for (feature, tenants) in &overlay.whitelist {
                registry.entry(feature).whitelist = tenants.clone();
            }
            for (feature, tenants) in &overlay.blacklist {
                registry.entry(feature).blacklist = tenants.clone();
            }
            Ok(overlay.touched())
        })
    }
}

/// A document whose every entry has been checked.
struct Overlay {
    phases: BTreeMap<String, RolloutPhase>,
    percentages: BTreeMap<String, u8>,
    whitelist: BTreeMap<String, BTreeSet<TenantId>>,
    blacklist: BTreeMap<String, BTreeSet<TenantId>>,
}

impl Overlay {
    fn validate(document: RolloutDocument) -> StoatResult<Self> {
        let phases = document
            .phases
            .into_iter()
            .map(|(feature, phase)| -> StoatResult<(String, RolloutPhase)> {
                let parsed = phase
                    .parse::<RolloutPhase>()
                    .map_err(|err| err.with_context(format!("feature '{feature}'")))?;
                Ok((feature, parsed))
            })
            .collect::<StoatResult<BTreeMap<_, _>>>()?;

        let percentages = document
            .percentages
            .into_iter()
            .map(|(feature, percentage)| match u8::try_from(percentage) {
                Ok(value) if value <= MAX_PERCENTAGE => Ok((feature, value)),
                _ => Err(StoatError::invalid(format!(
                    "feature '{feature}': percentage {percentage} outside 0..={MAX_PERCENTAGE}"
                ))),
            })
            .collect::<StoatResult<BTreeMap<_, _>>>()?;

        let into_sets = |lists: BTreeMap<String, Vec<TenantId>>| {
            lists
                .into_iter()
                .map(|(feature, tenants)| (feature, tenants.into_iter().collect()))
                .collect::<BTreeMap<_, BTreeSet<_>>>()
        };

        Ok(Self {
            phases,
            percentages,
            whitelist: into_sets(document.whitelist),
            blacklist: into_sets(document.blacklist),
        })
    }

    fn touched(&self) -> usize {
        self.phases
            .keys()
            .chain(self.percentages.keys())
            .chain(self.whitelist.keys())
            .chain(self.blacklist.keys())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn admin() -> PolicyAdmin {
        PolicyAdmin::new(Arc::new(RolloutController::with_defaults()))
    }

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id)
    }

    #[test]
    fn set_phase_rejects_unknown_names() {
        let admin = admin();
        let err = admin.set_phase("economy", "alpha").unwrap_err();
        assert!(err.is_invalid());
        assert_eq!(
            admin.controller().feature_status("economy").phase,
            RolloutPhase::Gradual
        );

        assert_eq!(admin.set_phase("economy", "Stable").unwrap(), RolloutPhase::Stable);
    }

    #[test]
    fn export_is_ordered_and_stamped() {
        let admin = admin();
        admin.whitelist_add("tickets", &tenant("guild-b"));
        admin.whitelist_add("tickets", &tenant("guild-a"));

        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let json = admin.export_at(at).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["phases"]["economy"], "gradual");
        assert_eq!(value["percentages"]["ai_chat"], 10);
        assert_eq!(value["whitelist"]["tickets"], serde_json::json!(["guild-a", "guild-b"]));
        assert_eq!(value["exported_at"], "2025-03-01T12:00:00+00:00");
        assert!(json.contains('\n'));
    }

    #[test]
    fn export_then_import_restores_state() {
        let source = admin();
        source.set_phase("economy", "stable").unwrap();
        source.blacklist_add("leveling", &tenant("guild-9"));
        let json = source.export().unwrap();

        let target = admin();
        target.import(&json).unwrap();
        assert_eq!(*target.controller().snapshot(), *source.controller().snapshot());
    }

    #[test]
    fn import_overlays() {
        let admin = admin();
        let touched = admin
            .import(r#"{"phases": {"ai_chat": "beta"}, "whitelist": {"ai_chat": ["guild-1"]}}"#)
            .unwrap();
        assert_eq!(touched, 1);
        assert!(admin
            .controller()
            .is_feature_enabled("ai_chat", &tenant("guild-1")));
        assert_eq!(
            admin.controller().feature_status("economy").phase,
            RolloutPhase::Gradual
        );
    }

    #[test]
    fn out_of_range_percentage_rejects_import() {
        let admin = admin();
        let before = admin.controller().snapshot();
        let err = admin
            .import(r#"{"phases": {"economy": "stable"}, "percentages": {"leveling": 101}}"#)
            .unwrap_err();
        assert!(err.is_invalid());
        assert_eq!(*admin.controller().snapshot(), *before);

        assert!(admin.import(r#"{"percentages": {"leveling": -1}}"#).is_err());
    }

    #[test]
    fn malformed_json_is_invalid() {
        let admin = admin();
        assert!(admin.import("{not json").unwrap_err().is_invalid());
        assert!(admin.import(r#"{"phases": {"economy": 3}}"#).unwrap_err().is_invalid());
    }
}
