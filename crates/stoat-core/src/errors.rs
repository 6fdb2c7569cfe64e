//! Unified error system for Stoat policy crates
//!
//! A single error type shared by the authorization and rollout layers. Lookup
//! absence is never an error here: providers report it through
//! [`Lookup::NotFound`](crate::effects::Lookup), and only genuine failures
//! travel as [`StoatError`].

use serde::{Deserialize, Serialize};

/// Unified error type for all Stoat policy operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum StoatError {
    /// Invalid input or configuration (malformed phase, out-of-range percentage)
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Permission denied
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// Error message describing the permission issue
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// The external policy data provider failed to answer
    #[error("Provider error: {message}")]
    Provider {
        /// Error message describing the provider failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl StoatError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error belongs to the invalid-configuration class
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }

    /// Prefix the message with additional context, keeping the variant
    pub fn with_context(self, context: impl std::fmt::Display) -> Self {
        let wrap = |message: String| format!("{context}: {message}");
        match self {
            Self::Invalid { message } => Self::Invalid {
                message: wrap(message),
            },
            Self::NotFound { message } => Self::NotFound {
                message: wrap(message),
            },
            Self::PermissionDenied { message } => Self::PermissionDenied {
                message: wrap(message),
            },
            Self::Serialization { message } => Self::Serialization {
                message: wrap(message),
            },
            Self::Provider { message } => Self::Provider {
                message: wrap(message),
            },
            Self::Internal { message } => Self::Internal {
                message: wrap(message),
            },
        }
    }
}

/// Standard Result type for Stoat operations
pub type StoatResult<T> = std::result::Result<T, StoatError>;

impl From<std::io::Error> for StoatError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoatError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for StoatError {
    fn from(err: toml::de::Error) -> Self {
        Self::invalid(format!("Invalid TOML: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = StoatError::invalid("unknown phase 'alpha'");
        assert!(err.is_invalid());
        assert_eq!(err.to_string(), "Invalid: unknown phase 'alpha'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = StoatError::from(io_err);
        assert!(matches!(err, StoatError::NotFound { .. }));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = StoatError::from(json_err);
        assert!(matches!(err, StoatError::Serialization { .. }));
    }
}
