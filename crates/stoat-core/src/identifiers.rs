//! Typed identifiers for tenants, users and roles.
//!
//! The chat platform hands out opaque string identifiers. Wrapping them keeps a
//! tenant id from being passed where a user id is expected.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of an independent community/server (a guild).
    TenantId
);

string_id!(
    /// Identifier of a platform user.
    UserId
);

string_id!(
    /// Identifier of a role within a tenant.
    RoleId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_serialize_transparently() {
        let tenant = TenantId::new("guild-1");
        let json = serde_json::to_string(&tenant).unwrap();
        assert_eq!(json, "\"guild-1\"");

        let back: TenantId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tenant);
    }

    #[test]
    fn display_is_raw_value() {
        assert_eq!(UserId::from("u1").to_string(), "u1");
        assert_eq!(RoleId::from("r9".to_string()).as_str(), "r9");
    }
}
