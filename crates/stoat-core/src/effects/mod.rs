//! Effect trait definitions
//!
//! Pure trait definitions for the side effects the policy crates depend on.
//! This module defines **what** data the decision logic may read; handlers
//! (the platform's membership store, or `stoat-testkit` in tests) define
//! **how** it is fetched.
//!
//! # Effect Classification
//!
//! - **Policy data** (`policy_data`): member, role and guild lookups served by
//!   the external membership store. Async and fallible; evaluators suspend on
//!   it but never retry.

pub mod policy_data;

pub use policy_data::{GuildRecord, Lookup, MemberRecord, PolicyDataProvider, RoleRecord};
