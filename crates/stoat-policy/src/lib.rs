//! # Stoat Policy
//!
//! Entry point for command handlers: [`PolicyEngine`] answers permission,
//! moderation and feature-gate questions, and exposes the rollout
//! management surface. [`PolicyConfig`] seeds the rollout registry and the
//! log filter from TOML and `STOAT_*` environment variables.

#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod telemetry;

pub use config::{FeatureConfig, PolicyConfig};
pub use engine::{PolicyEngine, AUDIT_TARGET};
pub use telemetry::{init_tracing, DEFAULT_LOG_FILTER};

pub use stoat_authorization::{DenialReason, GuardDecision};
pub use stoat_core::{PolicyDataProvider, RoleId, StoatError, StoatResult, TenantId, UserId};
pub use stoat_rollout::{PolicyAdmin, RolloutController, RolloutPhase};
