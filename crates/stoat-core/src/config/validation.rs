//! Configuration validation utilities

use crate::StoatError;

/// Configuration validation result
pub type ValidationResult = Result<(), ValidationError>;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Value is required but missing or empty
    #[error("Field '{field}' is required but missing")]
    Required {
        /// Dotted field path
        field: String,
    },

    /// Value is out of acceptable range
    #[error("Field '{field}' must be between {min} and {max} (got {actual})")]
    OutOfRange {
        /// Dotted field path
        field: String,
        /// Lowest accepted value
        min: i64,
        /// Highest accepted value
        max: i64,
        /// Value supplied
        actual: i64,
    },

    /// Custom validation failed
    #[error("Field '{field}': {message}")]
    Custom {
        /// Dotted field path
        field: String,
        /// What was wrong
        message: String,
    },
}

impl From<ValidationError> for StoatError {
    fn from(err: ValidationError) -> Self {
        StoatError::invalid(err.to_string())
    }
}

/// Accumulates validation failures across a configuration tree.
#[derive(Debug, Default)]
pub struct ConfigValidator {
    errors: Vec<ValidationError>,
    field_prefix: String,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator for a nested field
    pub fn for_field(&self, field_name: &str) -> Self {
        Self {
            errors: Vec::new(),
            field_prefix: self.full_field_name(field_name),
        }
    }

    /// Validate that a string is not blank
    pub fn non_empty(&mut self, field_name: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(ValidationError::Required {
                field: self.full_field_name(field_name),
            });
        }
        self
    }

    /// Validate that an integer lies in `min..=max`
    pub fn range(&mut self, field_name: &str, value: i64, min: i64, max: i64) -> &mut Self {
        if value < min || value > max {
            self.errors.push(ValidationError::OutOfRange {
                field: self.full_field_name(field_name),
                min,
                max,
                actual: value,
            });
        }
        self
    }

    /// Validate using a custom predicate
    pub fn custom(&mut self, field_name: &str, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(ValidationError::Custom {
                field: self.full_field_name(field_name),
                message: message.into(),
            });
        }
        self
    }

    /// Merge errors from another validator
    pub fn merge(&mut self, other: ConfigValidator) {
        self.errors.extend(other.errors);
    }

    /// Whether any rule has failed so far
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// First failure, if any
    pub fn result(self) -> ValidationResult {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Get all validation errors
    pub fn all_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    fn full_field_name(&self, field_name: &str) -> String {
        if self.field_prefix.is_empty() {
            field_name.to_string()
        } else {
            format!("{}.{}", self.field_prefix, field_name)
        }
    }
}
