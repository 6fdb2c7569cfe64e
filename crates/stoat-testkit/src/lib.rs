//! Stoat Testing Infrastructure
//!
//! In-memory policy data and fixture builders shared by the policy crates'
//! tests.
//!
//! Add this to your crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! stoat-testkit = { path = "../stoat-testkit" }
//! ```
//!
//! Then in your tests:
//! ```rust,ignore
//! use stoat_testkit::*;
//!
//! let data = TenantFixture::new("guild-1")
//!     .owner("owner")
//!     .role("mods", RoleRecord::at(5).granting(Permission::KickMembers))
//!     .member("alice", MemberRecord::new().moderator().with_role("mods"))
//!     .build();
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::TenantFixture;
pub use mocks::{FailureMode, InMemoryPolicyData};

pub use stoat_core::{
    GuildRecord, Lookup, MemberRecord, Permission, PermissionLevel, PolicyDataProvider, RoleId,
    RoleRecord, TenantId, UserId,
};
