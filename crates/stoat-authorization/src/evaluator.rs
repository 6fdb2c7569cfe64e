//! Permission evaluation
//!
//! Resolves a member's [`PermissionLevel`] and discrete permission grants from
//! data served by a [`PolicyDataProvider`].
//!
//! Absent records are "no grant", never an error. Provider failures are logged
//! and resolved conservatively by the infallible entry points (level
//! `Member`, grant `false`); the `try_` variants surface them for callers,
//! such as the hierarchy guard, that need to tell the two apart.

use std::sync::Arc;
use stoat_core::{
    Lookup, MemberRecord, Permission, PermissionLevel, PermissionSet, PolicyDataProvider, RoleId,
    RoleRecord, StoatResult, TenantId, UserId,
};
use tracing::{debug, error, warn};

use crate::INTEGRITY_TARGET;

/// A role a member holds, resolved to its definition.
pub type ResolvedRole = (RoleId, RoleRecord);

/// Resolves permission levels and grants for members of a tenant.
#[derive(Debug)]
pub struct PermissionEvaluator<P> {
    provider: Arc<P>,
}

impl<P> Clone for PermissionEvaluator<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: PolicyDataProvider> PermissionEvaluator<P> {
    /// Create an evaluator reading from `provider`.
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// The underlying data provider.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Resolve the permission level of `user` in `tenant`.
    ///
    /// Ownership is checked before membership and does not depend on the
    /// member record. A missing member record yields `Member`; so does a
    /// provider failure, which is logged.
    pub async fn permission_level(&self, tenant: &TenantId, user: &UserId) -> PermissionLevel {
        match self.try_permission_level(tenant, user).await {
            Ok(level) => level,
            Err(err) => {
                error!(%tenant, %user, error = %err, "permission level lookup failed");
                PermissionLevel::Member
            }
        }
    }

    /// Resolve the permission level, surfacing provider failures.
    pub async fn try_permission_level(
        &self,
        tenant: &TenantId,
        user: &UserId,
    ) -> StoatResult<PermissionLevel> {
        if let Lookup::Found(guild) = self.provider.get_guild(tenant).await? {
            if guild.owner_id == *user {
                return Ok(PermissionLevel::Owner);
            }
        }

        let level = match self.provider.get_member(tenant, user).await? {
            Lookup::Found(member) => member_level(&member),
            Lookup::NotFound => PermissionLevel::Member,
        };
        Ok(level)
    }

    /// Leveled check: does `user` reach the level `permission` requires?
    ///
    /// Permissions without an entry in the level table require only `Member`
    /// and are therefore granted to everyone. This is a fail-open default,
    /// logged at `warn` each time it is taken.
    pub async fn has_permission(
        &self,
        tenant: &TenantId,
        user: &UserId,
        permission: Permission,
    ) -> bool {
        let required = match permission.required_level() {
            Some(level) => level,
            None => {
                warn!(
                    %tenant,
                    %user,
                    %permission,
                    "permission has no required level; granting to all members"
                );
                PermissionLevel::Member
            }
        };

        let level = self.permission_level(tenant, user).await;
        let granted = level >= required;
        debug!(%tenant, %user, %permission, %level, %required, granted, "leveled permission check");
        granted
    }

    /// Leveled check by wire name.
    ///
    /// Names that do not parse fall open exactly like unlevelled permissions:
    /// they require only `Member`.
    pub async fn has_permission_named(&self, tenant: &TenantId, user: &UserId, name: &str) -> bool {
        match name.parse::<Permission>() {
            Ok(permission) => self.has_permission(tenant, user, permission).await,
            Err(_) => {
                warn!(%tenant, %user, permission = name, "unknown permission name; granting to all members");
                // Any resolved level satisfies Member; no lookup needed.
                true
            }
        }
    }

    /// Discrete check: does `user` hold the `permission` flag?
    ///
    /// Granted to the owner, to admins, and to members one of whose roles
    /// carries the flag or `administrator`.
    pub async fn has_flag(&self, tenant: &TenantId, user: &UserId, permission: Permission) -> bool {
        match self.try_has_flag(tenant, user, permission).await {
            Ok(granted) => granted,
            Err(err) => {
                error!(%tenant, %user, %permission, error = %err, "permission flag lookup failed");
                false
            }
        }
    }

    /// Discrete check, surfacing provider failures.
    pub async fn try_has_flag(
        &self,
        tenant: &TenantId,
        user: &UserId,
        permission: Permission,
    ) -> StoatResult<bool> {
        if self.try_is_owner(tenant, user).await? {
            return Ok(true);
        }
        let member = match self.provider.get_member(tenant, user).await? {
            Lookup::Found(member) => member,
            Lookup::NotFound => return Ok(false),
        };
        if member.is_admin {
            return Ok(true);
        }
        let roles = self.resolve_roles(tenant, user, &member).await?;
        Ok(roles.iter().any(|(_, role)| role.grants(permission)))
    }

    /// `true` as soon as one of `permissions` is held; `false` for an empty list.
    pub async fn any_of(&self, tenant: &TenantId, user: &UserId, permissions: &[Permission]) -> bool {
        for permission in permissions {
            if self.has_flag(tenant, user, *permission).await {
                return true;
            }
        }
        false
    }

    /// `false` as soon as one of `permissions` is missing; `true` for an empty list.
    pub async fn all_of(&self, tenant: &TenantId, user: &UserId, permissions: &[Permission]) -> bool {
        for permission in permissions {
            if !self.has_flag(tenant, user, *permission).await {
                return false;
            }
        }
        true
    }

    /// Every discrete permission `user` holds.
    pub async fn granted_permissions(&self, tenant: &TenantId, user: &UserId) -> PermissionSet {
        self.try_granted_permissions(tenant, user)
            .await
            .unwrap_or_else(|err| {
                error!(%tenant, %user, error = %err, "granted permission lookup failed");
                PermissionSet::new()
            })
    }

    async fn try_granted_permissions(
        &self,
        tenant: &TenantId,
        user: &UserId,
    ) -> StoatResult<PermissionSet> {
        let everything = || Permission::ALL.into_iter().collect::<PermissionSet>();

        if self.try_is_owner(tenant, user).await? {
            return Ok(everything());
        }
        let member = match self.provider.get_member(tenant, user).await? {
            Lookup::Found(member) => member,
            Lookup::NotFound => return Ok(PermissionSet::new()),
        };
        if member.is_admin {
            return Ok(everything());
        }
        let roles = self.resolve_roles(tenant, user, &member).await?;
        if roles
            .iter()
            .any(|(_, role)| role.permissions.contains(&Permission::Administrator))
        {
            return Ok(everything());
        }
        Ok(roles
            .into_iter()
            .flat_map(|(_, role)| role.permissions)
            .collect())
    }

    /// Whether `user` owns `tenant`.
    pub async fn is_owner(&self, tenant: &TenantId, user: &UserId) -> bool {
        self.try_is_owner(tenant, user).await.unwrap_or_else(|err| {
            error!(%tenant, %user, error = %err, "owner lookup failed");
            false
        })
    }

    /// Whether `user` is flagged admin.
    pub async fn is_admin(&self, tenant: &TenantId, user: &UserId) -> bool {
        self.member_matches(tenant, user, |member| member.is_admin).await
    }

    /// Whether `user` is flagged moderator; admins count as moderators.
    pub async fn is_moderator(&self, tenant: &TenantId, user: &UserId) -> bool {
        self.member_matches(tenant, user, |member| member.is_mod || member.is_admin)
            .await
    }

    /// Whether `user` holds `role`.
    pub async fn has_role(&self, tenant: &TenantId, user: &UserId, role: &RoleId) -> bool {
        self.member_matches(tenant, user, |member| member.has_role(role))
            .await
    }

    /// Whether `executor`'s permission level is strictly above `target`'s.
    /// Equal levels do not outrank each other.
    pub async fn outranks(&self, tenant: &TenantId, executor: &UserId, target: &UserId) -> bool {
        let executor_level = self.permission_level(tenant, executor).await;
        let target_level = self.permission_level(tenant, target).await;
        debug!(%tenant, %executor, %target, %executor_level, %target_level, "level comparison");
        executor_level > target_level
    }

    pub(crate) async fn try_is_owner(&self, tenant: &TenantId, user: &UserId) -> StoatResult<bool> {
        Ok(match self.provider.get_guild(tenant).await? {
            Lookup::Found(guild) => guild.owner_id == *user,
            Lookup::NotFound => false,
        })
    }

    /// Resolve the roles a member holds. Roles that do not resolve are
    /// skipped and reported as integrity warnings.
    pub(crate) async fn resolve_roles(
        &self,
        tenant: &TenantId,
        user: &UserId,
        member: &MemberRecord,
    ) -> StoatResult<Vec<ResolvedRole>> {
        let mut resolved = Vec::with_capacity(member.roles.len());
        for role_id in &member.roles {
            match self.provider.get_role(tenant, role_id).await? {
                Lookup::Found(role) => resolved.push((role_id.clone(), role)),
                Lookup::NotFound => {
                    warn!(
                        target: INTEGRITY_TARGET,
                        %tenant,
                        %user,
                        role = %role_id,
                        "member references a role that does not resolve"
                    );
                }
            }
        }
        Ok(resolved)
    }

    async fn member_matches(
        &self,
        tenant: &TenantId,
        user: &UserId,
        predicate: impl FnOnce(&MemberRecord) -> bool,
    ) -> bool {
        match self.provider.get_member(tenant, user).await {
            Ok(Lookup::Found(member)) => predicate(&member),
            Ok(Lookup::NotFound) => false,
            Err(err) => {
                error!(%tenant, %user, error = %err, "member lookup failed");
                false
            }
        }
    }
}

/// Level implied by a member record's flags (ownership aside).
pub fn member_level(member: &MemberRecord) -> PermissionLevel {
    if member.is_admin {
        PermissionLevel::Admin
    } else if member.is_mod {
        PermissionLevel::Moderator
    } else {
        PermissionLevel::Member
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoat_testkit::{FailureMode, TenantFixture};

    fn tenant() -> TenantId {
        TenantId::new("g1")
    }

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    fn evaluator() -> PermissionEvaluator<stoat_testkit::InMemoryPolicyData> {
        let data = TenantFixture::new("g1")
            .owner("owner")
            .role("kickers", RoleRecord::at(4).granting(Permission::KickMembers))
            .role("root", RoleRecord::at(9).granting(Permission::Administrator))
            .member("admin", MemberRecord::new().admin())
            .member("mod", MemberRecord::new().moderator().with_role("kickers"))
            .member("plain", MemberRecord::new())
            .member("rooted", MemberRecord::new().with_role("root"))
            .build();
        PermissionEvaluator::new(Arc::new(data))
    }

    #[tokio::test]
    async fn levels_follow_owner_then_flags() {
        let eval = evaluator();
        assert_eq!(eval.permission_level(&tenant(), &user("owner")).await, PermissionLevel::Owner);
        assert_eq!(eval.permission_level(&tenant(), &user("admin")).await, PermissionLevel::Admin);
        assert_eq!(eval.permission_level(&tenant(), &user("mod")).await, PermissionLevel::Moderator);
        assert_eq!(eval.permission_level(&tenant(), &user("plain")).await, PermissionLevel::Member);
        assert_eq!(eval.permission_level(&tenant(), &user("ghost")).await, PermissionLevel::Member);
    }

    #[tokio::test]
    async fn owner_without_member_record_is_owner() {
        let data = stoat_testkit::InMemoryPolicyData::new();
        data.insert_guild("g1", stoat_core::GuildRecord::owned_by("owner"));
        let eval = PermissionEvaluator::new(Arc::new(data));
        assert_eq!(eval.permission_level(&tenant(), &user("owner")).await, PermissionLevel::Owner);
    }

    #[tokio::test]
    async fn leveled_permissions_use_table() {
        let eval = evaluator();
        assert!(eval.has_permission(&tenant(), &user("admin"), Permission::BanMembers).await);
        assert!(!eval.has_permission(&tenant(), &user("mod"), Permission::BanMembers).await);
        assert!(eval.has_permission(&tenant(), &user("mod"), Permission::MuteMembers).await);
        assert!(!eval.has_permission(&tenant(), &user("plain"), Permission::MuteMembers).await);
        assert!(eval.has_permission(&tenant(), &user("plain"), Permission::SendMessages).await);
    }

    #[tokio::test]
    async fn unlevelled_and_unknown_permissions_fail_open() {
        let eval = evaluator();
        assert!(eval.has_permission(&tenant(), &user("plain"), Permission::AuditLog).await);
        assert!(eval.has_permission_named(&tenant(), &user("plain"), "launch_rockets").await);
        assert!(!eval.has_permission_named(&tenant(), &user("plain"), "BAN_MEMBERS").await);
    }

    #[tokio::test]
    async fn flags_come_from_roles_and_admin() {
        let eval = evaluator();
        assert!(eval.has_flag(&tenant(), &user("mod"), Permission::KickMembers).await);
        assert!(!eval.has_flag(&tenant(), &user("mod"), Permission::BanMembers).await);
        assert!(eval.has_flag(&tenant(), &user("admin"), Permission::BanMembers).await);
        assert!(eval.has_flag(&tenant(), &user("rooted"), Permission::ManageGuild).await);
        assert!(eval.has_flag(&tenant(), &user("owner"), Permission::ManageGuild).await);
        assert!(!eval.has_flag(&tenant(), &user("ghost"), Permission::SendMessages).await);
    }

    #[tokio::test]
    async fn combinators_short_circuit() {
        let eval = evaluator();
        let t = tenant();
        let m = user("mod");

        let before = eval.provider().lookup_count();
        assert!(eval.any_of(&t, &m, &[Permission::KickMembers, Permission::BanMembers]).await);
        let first_only = eval.provider().lookup_count() - before;

        let before = eval.provider().lookup_count();
        assert!(eval.has_flag(&t, &m, Permission::KickMembers).await);
        assert_eq!(eval.provider().lookup_count() - before, first_only);

        assert!(!eval.all_of(&t, &m, &[Permission::BanMembers, Permission::KickMembers]).await);
        assert!(eval.all_of(&t, &m, &[]).await);
        assert!(!eval.any_of(&t, &m, &[]).await);
    }

    #[tokio::test]
    async fn granted_permissions_expand_administrator() {
        let eval = evaluator();
        let all = eval.granted_permissions(&tenant(), &user("rooted")).await;
        assert_eq!(all.len(), Permission::ALL.len());

        let kick_only = eval.granted_permissions(&tenant(), &user("mod")).await;
        assert_eq!(kick_only.into_iter().collect::<Vec<_>>(), vec![Permission::KickMembers]);

        assert!(eval.granted_permissions(&tenant(), &user("ghost")).await.is_empty());
    }

    #[tokio::test]
    async fn outranking_is_strict_on_levels() {
        let eval = evaluator();
        let t = tenant();
        let ladder = ["owner", "admin", "mod", "plain"];
        for (i, higher) in ladder.iter().enumerate() {
            for lower in &ladder[i + 1..] {
                assert!(eval.outranks(&t, &user(higher), &user(lower)).await, "{higher} > {lower}");
                assert!(!eval.outranks(&t, &user(lower), &user(higher)).await, "{lower} < {higher}");
            }
        }

        // Equal levels deny both ways; role positions play no part.
        assert!(!eval.outranks(&t, &user("plain"), &user("rooted")).await);
        assert!(!eval.outranks(&t, &user("rooted"), &user("plain")).await);
        assert!(!eval.outranks(&t, &user("admin"), &user("admin")).await);
        assert!(!eval.outranks(&t, &user("plain"), &user("ghost")).await);
    }

    #[tokio::test]
    async fn membership_helpers() {
        let eval = evaluator();
        assert!(eval.is_owner(&tenant(), &user("owner")).await);
        assert!(eval.is_admin(&tenant(), &user("admin")).await);
        assert!(eval.is_moderator(&tenant(), &user("admin")).await);
        assert!(eval.is_moderator(&tenant(), &user("mod")).await);
        assert!(!eval.is_moderator(&tenant(), &user("plain")).await);
        assert!(eval.has_role(&tenant(), &user("mod"), &RoleId::new("kickers")).await);
        assert!(!eval.has_role(&tenant(), &user("plain"), &RoleId::new("kickers")).await);
    }

    #[tokio::test]
    async fn provider_failure_is_no_grant() {
        let eval = evaluator();
        eval.provider().fail(FailureMode::All);
        assert_eq!(eval.permission_level(&tenant(), &user("owner")).await, PermissionLevel::Member);
        assert!(!eval.has_flag(&tenant(), &user("admin"), Permission::BanMembers).await);
        assert!(!eval.is_admin(&tenant(), &user("admin")).await);
        assert!(eval.try_permission_level(&tenant(), &user("admin")).await.is_err());
    }
}
