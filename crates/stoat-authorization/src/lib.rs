//! # Stoat Authorization - Permission Levels and Role Hierarchy
//!
//! Pure decision functions consulted on the hot path of every privileged
//! command:
//!
//! - [`PermissionEvaluator`] resolves permission levels (owner, admin,
//!   moderator, member) and discrete permission grants.
//! - [`HierarchyGuard`] decides whether one member may moderate another or
//!   administer a role, using the evaluator plus role positions.
//!
//! Both read through a [`PolicyDataProvider`](stoat_core::PolicyDataProvider)
//! and own no I/O themselves.

#![forbid(unsafe_code)]
#![deny(clippy::await_holding_lock)]

pub mod decision;
pub mod evaluator;
pub mod hierarchy;

pub use decision::{DenialReason, GuardDecision, USER_DENIAL_MESSAGE};
pub use evaluator::{member_level, PermissionEvaluator, ResolvedRole};
pub use hierarchy::{compare_positions, top_position, HierarchyGuard, NO_ROLE_POSITION};

pub use stoat_core::INTEGRITY_TARGET;
