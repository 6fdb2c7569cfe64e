//! Role hierarchy guard
//!
//! Decides whether one member may moderate another, or administer a role.
//!
//! # Decision chain
//!
//! ```text
//! self? → owner actor? → owner target? → authority? → top roles → strict compare
//! ```
//!
//! The order is part of the contract: ownership short-circuits everything
//! after it, and the owner can never be a target. Top-role ties deny in both
//! directions.
//!
//! Missing records are hard denials with a specific reason and an integrity
//! warning; provider failures deny with [`DenialReason::LookupFailed`]. The
//! guard never retries and never returns an error.

use std::sync::Arc;
use stoat_core::{
    GuildRecord, Lookup, MemberRecord, Permission, PermissionLevel, PolicyDataProvider, RoleId,
    StoatError, StoatResult, TenantId, UserId,
};
use tracing::{debug, error, warn};

use crate::decision::{DenialReason, GuardDecision};
use crate::evaluator::{member_level, PermissionEvaluator, ResolvedRole};
use crate::INTEGRITY_TARGET;

/// Position of the implicit top role of a member without resolvable roles.
pub const NO_ROLE_POSITION: i64 = -1;

/// Flags that confer moderation authority below admin level.
const MODERATION_FLAGS: [Permission; 2] = [Permission::KickMembers, Permission::BanMembers];

/// Short-circuit helper: unwrap a guard step or return its denial.
macro_rules! step {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(reason) => return GuardDecision::deny(reason),
        }
    };
}

/// Guards moderation and role-management actions.
#[derive(Debug)]
pub struct HierarchyGuard<P> {
    evaluator: PermissionEvaluator<P>,
}

impl<P> Clone for HierarchyGuard<P> {
    fn clone(&self) -> Self {
        Self {
            evaluator: self.evaluator.clone(),
        }
    }
}

impl<P: PolicyDataProvider> HierarchyGuard<P> {
    /// Create a guard reading from `provider`.
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_evaluator(PermissionEvaluator::new(provider))
    }

    /// Create a guard sharing an existing evaluator.
    pub fn with_evaluator(evaluator: PermissionEvaluator<P>) -> Self {
        Self { evaluator }
    }

    /// The evaluator used for authority checks.
    pub fn evaluator(&self) -> &PermissionEvaluator<P> {
        &self.evaluator
    }

    /// May `actor` moderate (kick, ban, mute, ...) `target`?
    pub async fn can_moderate(
        &self,
        tenant: &TenantId,
        actor: &UserId,
        target: &UserId,
    ) -> GuardDecision {
        let decision = self.evaluate_moderation(tenant, actor, target).await;
        debug!(%tenant, %actor, %target, ?decision, "moderation hierarchy check");
        decision
    }

    /// May `actor` administer `role` (assign, edit, delete)?
    ///
    /// The role is resolved first, so a role that does not exist is denied
    /// even to the owner.
    pub async fn can_manage_role(
        &self,
        tenant: &TenantId,
        actor: &UserId,
        role: &RoleId,
    ) -> GuardDecision {
        let decision = self.evaluate_role_management(tenant, actor, role).await;
        debug!(%tenant, %actor, %role, ?decision, "role management hierarchy check");
        decision
    }

    /// Highest resolvable role of `user`, or `None` if they hold none.
    pub async fn top_role(
        &self,
        tenant: &TenantId,
        user: &UserId,
    ) -> StoatResult<Option<ResolvedRole>> {
        let member = match self.provider().get_member(tenant, user).await? {
            Lookup::Found(member) => member,
            Lookup::NotFound => {
                return Err(StoatError::not_found(format!(
                    "member {user} in tenant {tenant}"
                )))
            }
        };
        let roles = self.evaluator.resolve_roles(tenant, user, &member).await?;
        Ok(roles.into_iter().max_by_key(|(_, role)| role.position))
    }

    async fn evaluate_moderation(
        &self,
        tenant: &TenantId,
        actor: &UserId,
        target: &UserId,
    ) -> GuardDecision {
        // 1. self
        if actor == target {
            return GuardDecision::deny(DenialReason::SelfAction);
        }

        // 2. owner bypass
        let guild = step!(self.guild(tenant).await);
        if guild.owner_id == *actor {
            return GuardDecision::allow();
        }

        // 3. owner is untouchable
        if guild.owner_id == *target {
            return GuardDecision::deny(DenialReason::TargetIsOwner);
        }

        // 4. authority
        let actor_member = step!(
            self.member(tenant, actor, DenialReason::ActorNotFound)
                .await
        );
        let actor_roles = step!(self.roles(tenant, actor, &actor_member).await);
        let authorized = member_level(&actor_member) >= PermissionLevel::Admin
            || actor_roles
                .iter()
                .any(|(_, role)| MODERATION_FLAGS.iter().any(|flag| role.grants(*flag)));
        if !authorized {
            return GuardDecision::deny(DenialReason::InsufficientAuthority);
        }

        // 5. top roles
        let target_member = step!(
            self.member(tenant, target, DenialReason::TargetNotFound)
                .await
        );
        let target_roles = step!(self.roles(tenant, target, &target_member).await);

        // 6. strict comparison
        compare_positions(top_position(&actor_roles), top_position(&target_roles))
    }

    async fn evaluate_role_management(
        &self,
        tenant: &TenantId,
        actor: &UserId,
        role: &RoleId,
    ) -> GuardDecision {
        let target_role = match self.provider().get_role(tenant, role).await {
            Ok(Lookup::Found(record)) => record,
            Ok(Lookup::NotFound) => {
                warn!(target: INTEGRITY_TARGET, %tenant, %role, "role management on unknown role");
                return GuardDecision::deny(DenialReason::RoleNotFound);
            }
            Err(err) => return GuardDecision::deny(lookup_failed(tenant, "role", &err)),
        };

        let guild = step!(self.guild(tenant).await);
        if guild.owner_id == *actor {
            return GuardDecision::allow();
        }

        let actor_member = step!(
            self.member(tenant, actor, DenialReason::ActorNotFound)
                .await
        );
        let actor_roles = step!(self.roles(tenant, actor, &actor_member).await);
        let authorized = member_level(&actor_member) >= PermissionLevel::Admin
            || actor_roles
                .iter()
                .any(|(_, role)| role.grants(Permission::ManageRoles));
        if !authorized {
            return GuardDecision::deny(DenialReason::InsufficientAuthority);
        }

        compare_positions(top_position(&actor_roles), target_role.position)
    }

    fn provider(&self) -> &Arc<P> {
        self.evaluator.provider()
    }

    async fn guild(&self, tenant: &TenantId) -> Result<GuildRecord, DenialReason> {
        match self.provider().get_guild(tenant).await {
            Ok(Lookup::Found(guild)) => Ok(guild),
            Ok(Lookup::NotFound) => {
                warn!(target: INTEGRITY_TARGET, %tenant, "hierarchy check on tenant without guild record");
                Err(DenialReason::GuildNotFound)
            }
            Err(err) => Err(lookup_failed(tenant, "guild", &err)),
        }
    }

    async fn member(
        &self,
        tenant: &TenantId,
        user: &UserId,
        missing: DenialReason,
    ) -> Result<MemberRecord, DenialReason> {
        match self.provider().get_member(tenant, user).await {
            Ok(Lookup::Found(member)) => Ok(member),
            Ok(Lookup::NotFound) => {
                warn!(target: INTEGRITY_TARGET, %tenant, %user, reason = %missing, "hierarchy check on unknown member");
                Err(missing)
            }
            Err(err) => Err(lookup_failed(tenant, "member", &err)),
        }
    }

    async fn roles(
        &self,
        tenant: &TenantId,
        user: &UserId,
        member: &MemberRecord,
    ) -> Result<Vec<ResolvedRole>, DenialReason> {
        self.evaluator
            .resolve_roles(tenant, user, member)
            .await
            .map_err(|err| lookup_failed(tenant, "role", &err))
    }
}

/// Position of the highest role in `roles`, or [`NO_ROLE_POSITION`].
pub fn top_position(roles: &[ResolvedRole]) -> i64 {
    roles
        .iter()
        .map(|(_, role)| role.position)
        .max()
        .unwrap_or(NO_ROLE_POSITION)
}

/// Strict comparison: ties favour the target.
pub fn compare_positions(actor: i64, target: i64) -> GuardDecision {
    if actor > target {
        GuardDecision::allow()
    } else {
        GuardDecision::deny(DenialReason::EqualOrHigherRole)
    }
}

fn lookup_failed(tenant: &TenantId, what: &str, err: &StoatError) -> DenialReason {
    error!(%tenant, lookup = what, error = %err, "policy data lookup failed during hierarchy check");
    DenialReason::LookupFailed
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoat_core::RoleRecord;

    #[test]
    fn ties_deny() {
        assert!(compare_positions(5, 5).is_denied());
        assert!(compare_positions(4, 5).is_denied());
        assert!(compare_positions(6, 5).is_allowed());
    }

    #[test]
    fn no_roles_is_minus_one() {
        assert_eq!(top_position(&[]), NO_ROLE_POSITION);
        // Even a role at position 0 outranks a member without roles.
        assert!(compare_positions(0, top_position(&[])).is_allowed());
    }

    #[test]
    fn top_position_picks_max() {
        let roles = vec![
            (RoleId::new("a"), RoleRecord::at(3)),
            (RoleId::new("b"), RoleRecord::at(12)),
            (RoleId::new("c"), RoleRecord::at(-4)),
        ];
        assert_eq!(top_position(&roles), 12);
    }
}
