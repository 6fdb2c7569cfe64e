//! In-memory policy data provider
//!
//! Deterministic stand-in for the external membership store. Lookups can be
//! made to fail on demand so deny-on-provider-failure paths are testable.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use stoat_core::{
    GuildRecord, Lookup, MemberRecord, PolicyDataProvider, RoleId, RoleRecord, StoatError,
    StoatResult, TenantId, UserId,
};

/// Which lookups should report a provider failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Every lookup answers normally
    #[default]
    None,
    /// Every lookup fails
    All,
    /// Only member lookups fail
    Members,
    /// Only role lookups fail
    Roles,
    /// Only guild lookups fail
    Guilds,
}

#[derive(Debug, Default)]
struct State {
    guilds: HashMap<TenantId, GuildRecord>,
    members: HashMap<(TenantId, UserId), MemberRecord>,
    roles: HashMap<(TenantId, RoleId), RoleRecord>,
    failure: FailureMode,
    lookups: u64,
}

/// Policy data held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryPolicyData {
    state: RwLock<State>,
}

impl InMemoryPolicyData {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a guild.
    pub fn insert_guild(&self, tenant: impl Into<TenantId>, guild: GuildRecord) {
        self.state.write().guilds.insert(tenant.into(), guild);
    }

    /// Insert or replace a member.
    pub fn insert_member(
        &self,
        tenant: impl Into<TenantId>,
        user: impl Into<UserId>,
        member: MemberRecord,
    ) {
        self.state
            .write()
            .members
            .insert((tenant.into(), user.into()), member);
    }

    /// Insert or replace a role.
    pub fn insert_role(&self, tenant: impl Into<TenantId>, role: impl Into<RoleId>, record: RoleRecord) {
        self.state
            .write()
            .roles
            .insert((tenant.into(), role.into()), record);
    }

    /// Remove a role, leaving members that reference it dangling.
    pub fn remove_role(&self, tenant: impl Into<TenantId>, role: impl Into<RoleId>) {
        self.state.write().roles.remove(&(tenant.into(), role.into()));
    }

    /// Remove a member.
    pub fn remove_member(&self, tenant: impl Into<TenantId>, user: impl Into<UserId>) {
        self.state
            .write()
            .members
            .remove(&(tenant.into(), user.into()));
    }

    /// Configure failure injection.
    pub fn fail(&self, mode: FailureMode) {
        self.state.write().failure = mode;
    }

    /// Total number of lookups served (including failed ones).
    pub fn lookup_count(&self) -> u64 {
        self.state.read().lookups
    }

    fn check(&self, kind: FailureMode) -> StoatResult<()> {
        let mut state = self.state.write();
        state.lookups += 1;
        if state.failure == FailureMode::All || state.failure == kind {
            return Err(StoatError::provider(format!("injected {kind:?} lookup failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyDataProvider for InMemoryPolicyData {
    async fn get_member(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> StoatResult<Lookup<MemberRecord>> {
        self.check(FailureMode::Members)?;
        let state = self.state.read();
        Ok(state
            .members
            .get(&(tenant_id.clone(), user_id.clone()))
            .cloned()
            .into())
    }

    async fn get_role(
        &self,
        tenant_id: &TenantId,
        role_id: &RoleId,
    ) -> StoatResult<Lookup<RoleRecord>> {
        self.check(FailureMode::Roles)?;
        let state = self.state.read();
        Ok(state
            .roles
            .get(&(tenant_id.clone(), role_id.clone()))
            .cloned()
            .into())
    }

    async fn get_guild(&self, tenant_id: &TenantId) -> StoatResult<Lookup<GuildRecord>> {
        self.check(FailureMode::Guilds)?;
        let state = self.state.read();
        Ok(state.guilds.get(tenant_id).cloned().into())
    }
}
