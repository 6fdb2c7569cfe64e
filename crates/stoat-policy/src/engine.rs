//! The policy facade consulted by command handlers

use std::sync::Arc;
use stoat_authorization::{GuardDecision, HierarchyGuard, PermissionEvaluator};
use stoat_core::{PolicyDataProvider, RoleId, StoatResult, TenantId, UserId};
use stoat_rollout::{PolicyAdmin, RolloutController};
use tracing::info;

use crate::config::PolicyConfig;

/// Tracing target for denied decisions, carrying the internal reason.
pub const AUDIT_TARGET: &str = "stoat::audit";

/// Authorization and feature-gate decisions for one bot process.
#[derive(Debug)]
pub struct PolicyEngine<P> {
    guard: HierarchyGuard<P>,
    rollout: Arc<RolloutController>,
    admin: PolicyAdmin,
}

impl<P> Clone for PolicyEngine<P> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            rollout: Arc::clone(&self.rollout),
            admin: self.admin.clone(),
        }
    }
}

impl<P: PolicyDataProvider> PolicyEngine<P> {
    /// Engine reading policy data from `provider` and features from `rollout`.
    pub fn new(provider: Arc<P>, rollout: Arc<RolloutController>) -> Self {
        Self {
            guard: HierarchyGuard::new(provider),
            admin: PolicyAdmin::new(Arc::clone(&rollout)),
            rollout,
        }
    }

    /// Engine whose rollout registry is built from `config`.
    pub fn from_config(provider: Arc<P>, config: &PolicyConfig) -> StoatResult<Self> {
        let registry = config.to_registry()?;
        info!(features = registry.len(), "policy engine configured");
        Ok(Self::new(provider, Arc::new(RolloutController::new(registry))))
    }

    /// Permission evaluator shared with the guard.
    pub fn evaluator(&self) -> &PermissionEvaluator<P> {
        self.guard.evaluator()
    }

    /// Hierarchy guard.
    pub fn guard(&self) -> &HierarchyGuard<P> {
        &self.guard
    }

    /// Rollout controller.
    pub fn rollout(&self) -> &Arc<RolloutController> {
        &self.rollout
    }

    /// Management surface over the same registry this engine reads.
    pub fn admin(&self) -> &PolicyAdmin {
        &self.admin
    }

    /// Leveled permission check by name. Unknown names are granted; see
    /// [`PermissionEvaluator::has_permission_named`].
    pub async fn evaluate_permission(
        &self,
        tenant: &TenantId,
        user: &UserId,
        permission: &str,
    ) -> bool {
        let granted = self
            .evaluator()
            .has_permission_named(tenant, user, permission)
            .await;
        if !granted {
            info!(target: AUDIT_TARGET, %tenant, %user, permission, "permission denied");
        }
        granted
    }

    /// `(allowed, reason)`; the reason is internal and only set on denial.
    /// Show end users [`GuardDecision::user_message`] instead.
    pub async fn can_moderate(
        &self,
        tenant: &TenantId,
        actor: &UserId,
        target: &UserId,
    ) -> (bool, Option<String>) {
        let decision = self.guard.can_moderate(tenant, actor, target).await;
        if let GuardDecision::Deny { reason } = &decision {
            info!(target: AUDIT_TARGET, %tenant, %actor, %target, %reason, "moderation denied");
        }
        decision.into_pair()
    }

    /// May `actor` administer `role`?
    pub async fn can_manage_role(&self, tenant: &TenantId, actor: &UserId, role: &RoleId) -> bool {
        let decision = self.guard.can_manage_role(tenant, actor, role).await;
        if let GuardDecision::Deny { reason } = &decision {
            info!(target: AUDIT_TARGET, %tenant, %actor, %role, %reason, "role management denied");
        }
        decision.is_allowed()
    }

    /// Is `feature` active for `tenant`?
    pub fn is_feature_enabled(&self, feature: &str, tenant: &TenantId) -> bool {
        self.rollout.is_feature_enabled(feature, tenant)
    }
}
