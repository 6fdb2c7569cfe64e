//! # Stoat Rollout
//!
//! Progressive feature rollout per tenant:
//!
//! - [`RolloutPhase`] - the operator-driven phase ladder
//! - [`bucket()`] - deterministic, sticky percentage cohorts
//! - [`RolloutController`] - copy-on-write feature registry and evaluation
//! - [`PolicyAdmin`] - management surface with JSON export and atomic import
//!
//! Evaluation precedence, first match wins:
//!
//! ```text
//! blacklist → deprecated → stable → beta (whitelist) → gradual (bucket) → internal
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::await_holding_lock)]

pub mod admin;
pub mod bucket;
pub mod controller;
pub mod decision;
pub mod defaults;
pub mod flag;
pub mod phase;
pub mod registry;
pub mod status;

pub use admin::{PolicyAdmin, RolloutDocument};
pub use bucket::{bucket, in_cohort};
pub use controller::RolloutController;
pub use decision::RolloutDecision;
pub use defaults::{default_registry, DEFAULT_FEATURES};
pub use flag::{FeatureFlag, MAX_PERCENTAGE};
pub use phase::RolloutPhase;
pub use registry::RolloutRegistry;
pub use status::{FeatureStatus, PhaseProgress};
