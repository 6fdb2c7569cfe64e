//! Configuration traits and validation shared by Stoat crates

pub mod traits;
pub mod validation;

pub use traits::{env_key_to_path, read_toml_file, StoatConfig, ENV_PATH_SEPARATOR, ENV_PREFIX};
pub use validation::{ConfigValidator, ValidationError, ValidationResult};
