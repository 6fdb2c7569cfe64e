//! # Stoat Core - Policy Foundations
//!
//! Shared vocabulary for the Stoat authorization and rollout control plane:
//!
//! - `errors` - the unified [`StoatError`] type
//! - `identifiers` - typed tenant, user and role ids
//! - `permission` - the closed permission set and permission level ladder
//! - `effects` - the [`PolicyDataProvider`] capability interface
//! - `config` - configuration traits and validation
//!
//! Nothing in this crate performs I/O; data access is expressed as effect
//! traits that the hosting bot implements.

#![forbid(unsafe_code)]

pub mod config;
pub mod effects;
pub mod errors;
pub mod identifiers;
pub mod permission;

pub use effects::{GuildRecord, Lookup, MemberRecord, PolicyDataProvider, RoleRecord};
pub use errors::{StoatError, StoatResult};
pub use identifiers::{RoleId, TenantId, UserId};
pub use permission::{Permission, PermissionLevel, PermissionSet};

/// Tracing target for data-integrity signals: records a decision referenced
/// but could not find (dangling roles, unknown members, guilds or features).
pub const INTEGRITY_TARGET: &str = "stoat::integrity";
