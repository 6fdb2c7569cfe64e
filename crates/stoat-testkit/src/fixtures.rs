//! Fixture builders for tenants with owners, roles and members

use stoat_core::{GuildRecord, MemberRecord, RoleId, RoleRecord, TenantId, UserId};

use crate::mocks::InMemoryPolicyData;

/// Builder describing one tenant's membership data.
#[derive(Debug, Clone)]
pub struct TenantFixture {
    tenant: TenantId,
    owner: Option<UserId>,
    roles: Vec<(RoleId, RoleRecord)>,
    members: Vec<(UserId, MemberRecord)>,
}

impl TenantFixture {
    /// Start describing `tenant`. Without [`owner`](Self::owner) no guild
    /// record is installed.
    pub fn new(tenant: impl Into<TenantId>) -> Self {
        Self {
            tenant: tenant.into(),
            owner: None,
            roles: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Set the tenant owner. The owner also gets a plain member record.
    pub fn owner(mut self, owner: impl Into<UserId>) -> Self {
        let owner = owner.into();
        self.members.push((owner.clone(), MemberRecord::new()));
        self.owner = Some(owner);
        self
    }

    /// Define a role.
    pub fn role(mut self, role: impl Into<RoleId>, record: RoleRecord) -> Self {
        self.roles.push((role.into(), record));
        self
    }

    /// Define a member. Later definitions for the same user win.
    pub fn member(mut self, user: impl Into<UserId>, record: MemberRecord) -> Self {
        self.members.push((user.into(), record));
        self
    }

    /// Tenant this fixture describes.
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Install this tenant into an existing store.
    pub fn install_into(&self, data: &InMemoryPolicyData) {
        if let Some(owner) = &self.owner {
            data.insert_guild(self.tenant.clone(), GuildRecord::owned_by(owner.clone()));
        }
        for (role, record) in &self.roles {
            data.insert_role(self.tenant.clone(), role.clone(), record.clone());
        }
        for (user, record) in &self.members {
            data.insert_member(self.tenant.clone(), user.clone(), record.clone());
        }
    }

    /// Build a fresh store containing only this tenant.
    pub fn build(self) -> InMemoryPolicyData {
        let data = InMemoryPolicyData::new();
        self.install_into(&data);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoat_core::{Lookup, Permission, PolicyDataProvider};

    #[tokio::test]
    async fn fixture_installs_everything() {
        let data = TenantFixture::new("g1")
            .owner("owner")
            .role("mods", RoleRecord::at(3).granting(Permission::KickMembers))
            .member("alice", MemberRecord::new().moderator().with_role("mods"))
            .build();

        let tenant = TenantId::new("g1");
        let guild = data.get_guild(&tenant).await.unwrap().found().unwrap();
        assert_eq!(guild.owner_id, UserId::new("owner"));

        let alice = data.get_member(&tenant, &UserId::new("alice")).await.unwrap();
        assert!(matches!(alice, Lookup::Found(ref m) if m.is_mod));

        let role = data.get_role(&tenant, &RoleId::new("mods")).await.unwrap();
        assert_eq!(role.found().map(|r| r.position), Some(3));
    }
}
