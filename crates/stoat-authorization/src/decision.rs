//! Guard decision vocabulary
//!
//! Every hierarchy check ends in a [`GuardDecision`]. Denials carry a typed
//! [`DenialReason`] for audit logs; end users only ever see
//! [`GuardDecision::user_message`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message shown to end users for any denied privileged command.
pub const USER_DENIAL_MESSAGE: &str = "permission denied";

/// Why a hierarchy check refused an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// Actor and target are the same user
    SelfAction,
    /// The target owns the tenant
    TargetIsOwner,
    /// The actor lacks the authority the action needs
    InsufficientAuthority,
    /// The target's top role is not strictly below the actor's
    EqualOrHigherRole,
    /// The tenant has no guild record
    GuildNotFound,
    /// The actor has no member record
    ActorNotFound,
    /// The target has no member record
    TargetNotFound,
    /// The target role does not exist
    RoleNotFound,
    /// The policy data provider failed to answer
    LookupFailed,
}

impl DenialReason {
    /// Audit string for the reason.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfAction => "cannot act on self",
            Self::TargetIsOwner => "cannot act on owner",
            Self::InsufficientAuthority => "insufficient authority",
            Self::EqualOrHigherRole => "target has equal or higher role",
            Self::GuildNotFound => "guild not found",
            Self::ActorNotFound => "actor not found",
            Self::TargetNotFound => "target not found",
            Self::RoleNotFound => "role not found",
            Self::LookupFailed => "policy lookup failed",
        }
    }

    /// Whether the denial stems from missing or unreadable data rather than
    /// from policy.
    pub fn is_data_problem(self) -> bool {
        matches!(
            self,
            Self::GuildNotFound
                | Self::ActorNotFound
                | Self::TargetNotFound
                | Self::RoleNotFound
                | Self::LookupFailed
        )
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision from a hierarchy guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardDecision {
    /// The action may proceed.
    Allow,
    /// The action is refused.
    Deny {
        /// Internal reason, for audit logs only
        reason: DenialReason,
    },
}

impl GuardDecision {
    /// Create an allow decision.
    pub fn allow() -> Self {
        Self::Allow
    }

    /// Create a deny decision with a reason.
    pub fn deny(reason: DenialReason) -> Self {
        Self::Deny { reason }
    }

    /// Returns `true` if the decision allows the action.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns `true` if the decision denies the action.
    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }

    /// Returns the denial reason, if denied.
    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            Self::Allow => None,
            Self::Deny { reason } => Some(*reason),
        }
    }

    /// Generic message for end users; `None` when allowed.
    pub fn user_message(&self) -> Option<&'static str> {
        self.is_denied().then_some(USER_DENIAL_MESSAGE)
    }

    /// `(allowed, reason)` pair as handed to command handlers.
    pub fn into_pair(self) -> (bool, Option<String>) {
        match self {
            Self::Allow => (true, None),
            Self::Deny { reason } => (false, Some(reason.to_string())),
        }
    }
}
