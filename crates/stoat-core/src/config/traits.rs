//! Core configuration traits

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::{StoatError, StoatResult};

/// Prefix of environment variables that override configuration values
pub const ENV_PREFIX: &str = "STOAT_";

/// Separator between path segments in an environment variable name
pub const ENV_PATH_SEPARATOR: &str = "__";

/// Core trait for Stoat configuration types
pub trait StoatConfig: Clone + Default + Send + Sync + 'static {
    /// Get default configuration values
    fn defaults() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> StoatResult<Self>;

    /// Merge with process environment variables carrying [`ENV_PREFIX`]
    fn merge_with_env(&mut self) -> StoatResult<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Merge with an explicit set of `(name, value)` variables
    ///
    /// `STOAT_FEATURES__ECONOMY__PERCENTAGE=80` sets
    /// `features.economy.percentage`. Variables without the prefix are ignored.
    fn merge_with_vars<I>(&mut self, vars: I) -> StoatResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            if let Some(key) = env_key_to_path(&name) {
                self.set_from_string(&key, &value)?;
            }
        }
        Ok(())
    }

    /// Merge with another configuration; `other` wins where it sets a value
    fn merge_with(&mut self, other: &Self) -> StoatResult<()>;

    /// Validate the configuration
    fn validate(&self) -> StoatResult<()>;

    /// Set a configuration value from a dotted key and a string value
    fn set_from_string(&mut self, key: &str, value: &str) -> StoatResult<()>;
}

/// Translate an environment variable name into a dotted configuration key.
pub fn env_key_to_path(name: &str) -> Option<String> {
    let rest = name.strip_prefix(ENV_PREFIX)?;
    if rest.is_empty() {
        return None;
    }
    let key = rest
        .split(ENV_PATH_SEPARATOR)
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join(".");
    Some(key)
}

/// Read and deserialize a TOML file.
pub fn read_toml_file<T: DeserializeOwned>(path: &Path) -> StoatResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        StoatError::from(e).with_context(format!("reading config {}", path.display()))
    })?;
    let value = toml::from_str(&content)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_names_map_to_dotted_keys() {
        assert_eq!(env_key_to_path("STOAT_LOG_FILTER").as_deref(), Some("log_filter"));
        assert_eq!(
            env_key_to_path("STOAT_FEATURES__SOCIAL_ALERTS__PHASE").as_deref(),
            Some("features.social_alerts.phase")
        );
        assert_eq!(env_key_to_path("HOME"), None);
        assert_eq!(env_key_to_path("STOAT_"), None);
    }
}
