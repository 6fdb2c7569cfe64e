//! Policy data effects
//!
//! The capability interface through which authorization logic reads
//! membership, role and guild data. Absence is an explicit variant
//! ([`Lookup::NotFound`]) rather than an error, so every "deny on missing
//! data" branch in the evaluators is a visible, testable match arm.
//!
//! # Effect Classification
//!
//! - **Category**: Application Effect
//! - **Implementation**: external membership store (production),
//!   `stoat-testkit` (tests)
//! - **Usage**: `stoat-authorization` evaluators
//!
//! Retry and backoff belong to the implementation; callers treat an `Err` as a
//! failed lookup and decide conservatively.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::identifiers::{RoleId, TenantId, UserId};
use crate::permission::{Permission, PermissionSet};
use crate::StoatResult;

/// Outcome of a lookup that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookup<T> {
    /// The record exists
    Found(T),
    /// The record does not exist
    NotFound,
}

impl<T> Lookup<T> {
    /// Returns `true` if the record was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Borrow the record, if found.
    pub fn as_ref(&self) -> Lookup<&T> {
        match self {
            Self::Found(value) => Lookup::Found(value),
            Self::NotFound => Lookup::NotFound,
        }
    }

    /// Convert into an `Option`.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    /// Map the found record.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::NotFound => Lookup::NotFound,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Found(value),
            None => Self::NotFound,
        }
    }
}

/// Membership of one user in one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Assigned roles (unordered)
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
    /// Tenant administrator flag
    #[serde(default)]
    pub is_admin: bool,
    /// Tenant moderator flag
    #[serde(default)]
    pub is_mod: bool,
}

impl MemberRecord {
    /// Create a member with no roles and no flags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the member as administrator.
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    /// Mark the member as moderator.
    pub fn moderator(mut self) -> Self {
        self.is_mod = true;
        self
    }

    /// Assign a role.
    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Whether the member holds the given role.
    pub fn has_role(&self, role: &RoleId) -> bool {
        self.roles.contains(role)
    }
}

/// A role definition inside a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    /// Rank in the hierarchy; higher means more authority. Not necessarily
    /// contiguous, ties are possible.
    pub position: i64,
    /// Discrete permission flags granted by the role
    #[serde(default)]
    pub permissions: PermissionSet,
}

impl RoleRecord {
    /// Create a role at the given position with no permissions.
    pub fn at(position: i64) -> Self {
        Self {
            position,
            permissions: PermissionSet::new(),
        }
    }

    /// Grant a permission flag.
    pub fn granting(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    /// Whether the role grants the flag, directly or through `administrator`.
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
            || self.permissions.contains(&Permission::Administrator)
    }
}

/// Tenant-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRecord {
    /// The single owner of the tenant
    pub owner_id: UserId,
}

impl GuildRecord {
    /// Create a guild record owned by `owner_id`.
    pub fn owned_by(owner_id: impl Into<UserId>) -> Self {
        Self {
            owner_id: owner_id.into(),
        }
    }
}

/// Read-only access to membership, role and guild data.
#[async_trait]
pub trait PolicyDataProvider: Send + Sync {
    /// Fetch a member record.
    async fn get_member(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> StoatResult<Lookup<MemberRecord>>;

    /// Fetch a role definition.
    async fn get_role(
        &self,
        tenant_id: &TenantId,
        role_id: &RoleId,
    ) -> StoatResult<Lookup<RoleRecord>>;

    /// Fetch guild metadata.
    async fn get_guild(&self, tenant_id: &TenantId) -> StoatResult<Lookup<GuildRecord>>;
}

#[async_trait]
impl<P: PolicyDataProvider + ?Sized> PolicyDataProvider for Arc<P> {
    async fn get_member(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> StoatResult<Lookup<MemberRecord>> {
        (**self).get_member(tenant_id, user_id).await
    }

    async fn get_role(
        &self,
        tenant_id: &TenantId,
        role_id: &RoleId,
    ) -> StoatResult<Lookup<RoleRecord>> {
        (**self).get_role(tenant_id, role_id).await
    }

    async fn get_guild(&self, tenant_id: &TenantId) -> StoatResult<Lookup<GuildRecord>> {
        (**self).get_guild(tenant_id).await
    }
}
