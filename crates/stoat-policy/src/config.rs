//! Policy configuration
//!
//! ```toml
//! log_filter = "info,stoat::audit=debug"
//!
//! [features.economy]
//! phase = "gradual"
//! percentage = 50
//! blacklist = ["123456789"]
//! description = "Currency and shop commands"
//! ```
//!
//! Features listed in a file overlay the built-in table; features the file
//! does not mention keep their defaults. Environment variables overlay the
//! result: `STOAT_LOG_FILTER`, `STOAT_FEATURES__<NAME>__<FIELD>`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use stoat_core::config::{read_toml_file, ConfigValidator, StoatConfig};
use stoat_core::{StoatError, StoatResult, TenantId};
use stoat_rollout::{FeatureFlag, RolloutPhase, RolloutRegistry, DEFAULT_FEATURES, MAX_PERCENTAGE};
use tracing::warn;

use crate::telemetry::DEFAULT_LOG_FILTER;

/// Top-level policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// `tracing-subscriber` filter directive
    pub log_filter: String,
    /// Rollout state per feature name
    pub features: BTreeMap<String, FeatureConfig>,
}

/// Rollout settings for one feature.
///
/// Values are kept as written so that validation can report every bad
/// entry instead of failing on the first one during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Rollout phase name
    pub phase: String,
    /// Gradual rollout percentage
    pub percentage: i64,
    /// Tenants enabled while in beta
    pub whitelist: BTreeSet<TenantId>,
    /// Tenants always disabled
    pub blacklist: BTreeSet<TenantId>,
    /// Operator-facing description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Shape of a configuration file: every field optional, so a file only
/// overrides what it names.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PolicyFile {
    log_filter: Option<String>,
    features: BTreeMap<String, FeatureOverlay>,
}

/// One feature table from a configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeatureOverlay {
    phase: Option<String>,
    percentage: Option<i64>,
    whitelist: Option<BTreeSet<TenantId>>,
    blacklist: Option<BTreeSet<TenantId>>,
    description: Option<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            phase: RolloutPhase::Internal.as_str().to_owned(),
            percentage: 0,
            whitelist: BTreeSet::new(),
            blacklist: BTreeSet::new(),
            description: None,
        }
    }
}

impl FeatureConfig {
    fn overlay(&mut self, overlay: FeatureOverlay) {
        if let Some(phase) = overlay.phase {
            self.phase = phase.trim().to_ascii_lowercase();
        }
        if let Some(percentage) = overlay.percentage {
            self.percentage = percentage;
        }
        if let Some(whitelist) = overlay.whitelist {
            self.whitelist = whitelist;
        }
        if let Some(blacklist) = overlay.blacklist {
            self.blacklist = blacklist;
        }
        if let Some(description) = overlay.description {
            self.description = Some(description);
        }
    }

    fn to_flag(&self) -> StoatResult<FeatureFlag> {
        let phase = self.phase.parse::<RolloutPhase>()?;
        let percentage = u8::try_from(self.percentage)
            .ok()
            .filter(|pct| *pct <= MAX_PERCENTAGE)
            .ok_or_else(|| {
                StoatError::invalid(format!("percentage {} outside 0..=100", self.percentage))
            })?;
        Ok(FeatureFlag {
            phase,
            percentage,
            whitelist: self.whitelist.clone(),
            blacklist: self.blacklist.clone(),
            description: self.description.clone(),
        })
    }

    fn validate(&self, validator: &mut ConfigValidator) {
        validator
            .custom(
                "phase",
                self.phase.parse::<RolloutPhase>().is_ok(),
                format!("unknown rollout phase '{}'", self.phase),
            )
            .range("percentage", self.percentage, 0, i64::from(MAX_PERCENTAGE));
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let features = DEFAULT_FEATURES
            .iter()
            .map(|(name, phase, percentage)| {
                let feature = FeatureConfig {
                    phase: phase.as_str().to_owned(),
                    percentage: i64::from(*percentage),
                    ..FeatureConfig::default()
                };
                ((*name).to_owned(), feature)
            })
            .collect();
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            features,
        }
    }
}

impl PolicyConfig {
    /// Defaults, overlaid with `path` if given, then with the environment,
    /// then validated.
    pub fn load(path: Option<&Path>) -> StoatResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::defaults(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Tenants both whitelisted and blacklisted, per feature. Not an error:
    /// the blacklist wins at evaluation time.
    pub fn override_conflicts(&self) -> Vec<(String, TenantId)> {
        self.features
            .iter()
            .flat_map(|(name, feature)| {
                feature
                    .whitelist
                    .intersection(&feature.blacklist)
                    .map(move |tenant| (name.clone(), tenant.clone()))
            })
            .collect()
    }

    /// Build the rollout registry described by this configuration.
    pub fn to_registry(&self) -> StoatResult<RolloutRegistry> {
        self.validate()?;
        self.features
            .iter()
            .try_fold(RolloutRegistry::new(), |registry, (name, feature)| -> StoatResult<_> {
                let flag = feature
                    .to_flag()
                    .map_err(|err| err.with_context(format!("features.{name}")))?;
                Ok(registry.with_feature(name.clone(), flag))
            })
    }

    fn feature_mut(&mut self, name: &str) -> &mut FeatureConfig {
        self.features.entry(name.to_owned()).or_default()
    }
}

impl StoatConfig for PolicyConfig {
    fn load_from_file(path: &Path) -> StoatResult<Self> {
        let file: PolicyFile = read_toml_file(path)?;
        let mut config = Self::defaults();
        if let Some(log_filter) = file.log_filter {
            config.log_filter = log_filter;
        }
        for (name, overlay) in file.features {
            config.feature_mut(&name).overlay(overlay);
        }
        Ok(config)
    }

    /// `other` is a complete configuration, so its feature entries replace
    /// ours whole.
    fn merge_with(&mut self, other: &Self) -> StoatResult<()> {
        if other.log_filter != DEFAULT_LOG_FILTER {
            self.log_filter = other.log_filter.clone();
        }
        for (name, feature) in &other.features {
            self.features.insert(name.clone(), feature.clone());
        }
        Ok(())
    }

    fn validate(&self) -> StoatResult<()> {
        let mut validator = ConfigValidator::new();
        validator.non_empty("log_filter", &self.log_filter);

        let features = validator.for_field("features");
        for (name, feature) in &self.features {
            let mut field = features.for_field(name);
            feature.validate(&mut field);
            validator.merge(field);
        }

        for (name, tenant) in self.override_conflicts() {
            warn!(feature = %name, %tenant, "tenant is both whitelisted and blacklisted; blacklist wins");
        }

        validator.result()?;
        Ok(())
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> StoatResult<()> {
        if key == "log_filter" {
            self.log_filter = value.to_owned();
            return Ok(());
        }

        let (name, field) = key
            .strip_prefix("features.")
            .and_then(|rest| rest.rsplit_once('.'))
            .ok_or_else(|| StoatError::invalid(format!("unknown configuration key '{key}'")))?;

        match field {
            "phase" => self.feature_mut(name).phase = value.trim().to_ascii_lowercase(),
            "percentage" => {
                let percentage = value.trim().parse::<i64>().map_err(|_| {
                    StoatError::invalid(format!("{key}: '{value}' is not an integer"))
                })?;
                self.feature_mut(name).percentage = percentage;
            }
            "whitelist" => self.feature_mut(name).whitelist = tenant_list(value),
            "blacklist" => self.feature_mut(name).blacklist = tenant_list(value),
            "description" => self.feature_mut(name).description = Some(value.to_owned()),
            _ => {
                return Err(StoatError::invalid(format!(
                    "unknown configuration key '{key}'"
                )))
            }
        }
        Ok(())
    }
}

/// Comma-separated tenant ids; blanks are dropped.
fn tenant_list(value: &str) -> BTreeSet<TenantId> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(TenantId::new)
        .collect()
}
