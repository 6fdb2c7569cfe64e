//! Permission vocabulary
//!
//! A closed set of permission identifiers and the four-step permission level
//! ladder. Two kinds of checks use this vocabulary:
//!
//! - **Leveled** checks compare a member's [`PermissionLevel`] against the
//!   minimum level a permission requires ([`Permission::required_level`]).
//! - **Discrete** checks ask whether a member holds the permission flag itself,
//!   either through admin status or through one of their roles.
//!
//! # Fail-open risk
//!
//! Only ten permissions carry a leveled requirement. Every other permission,
//! and any name that does not parse, resolves to [`PermissionLevel::Member`]
//! in a leveled check, so it is granted to everyone. Callers that gate
//! sensitive actions should use a permission with an explicit level or a
//! discrete check.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::StoatError;

/// Resolved authority of a member inside a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// Regular member
    Member = 0,
    /// Member record flagged `is_mod`
    Moderator = 1,
    /// Member record flagged `is_admin`
    Admin = 2,
    /// The tenant owner
    Owner = 3,
}

impl PermissionLevel {
    /// Numeric rank of the level.
    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Member => "member",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
            Self::Owner => "owner",
        };
        f.write_str(name)
    }
}

/// Named permission flags understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // Server
    /// Implies every other flag
    Administrator,
    /// Change server settings
    ManageServer,
    /// Create, edit and assign roles
    ManageRoles,
    /// Create and edit channels
    ManageChannels,
    /// Remove members
    KickMembers,
    /// Ban members
    BanMembers,
    /// Create invites
    CreateInvites,
    /// Manage guild-level integrations
    ManageGuild,
    /// Read the audit log
    AuditLog,

    // Members
    /// Edit member profiles
    ManageMembers,
    /// Mute members
    MuteMembers,
    /// Deafen members in voice
    DeafenMembers,

    // Channel
    /// See a channel
    ViewChannel,
    /// Post messages
    SendMessages,
    /// Read messages
    ReadMessages,
    /// Delete or pin others' messages
    ManageMessages,
    /// Post link embeds
    EmbedLinks,
    /// Upload files
    AttachFiles,
    /// Read earlier messages
    ReadMessageHistory,
    /// Mention everyone
    MentionEveryone,
    /// Use emojis from other servers
    UseExternalEmojis,
}

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: [Permission; 21] = [
        Permission::Administrator,
        Permission::ManageServer,
        Permission::ManageRoles,
        Permission::ManageChannels,
        Permission::KickMembers,
        Permission::BanMembers,
        Permission::CreateInvites,
        Permission::ManageGuild,
        Permission::AuditLog,
        Permission::ManageMembers,
        Permission::MuteMembers,
        Permission::DeafenMembers,
        Permission::ViewChannel,
        Permission::SendMessages,
        Permission::ReadMessages,
        Permission::ManageMessages,
        Permission::EmbedLinks,
        Permission::AttachFiles,
        Permission::ReadMessageHistory,
        Permission::MentionEveryone,
        Permission::UseExternalEmojis,
    ];

    /// Wire name of the permission.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::ManageServer => "manage_server",
            Self::ManageRoles => "manage_roles",
            Self::ManageChannels => "manage_channels",
            Self::KickMembers => "kick_members",
            Self::BanMembers => "ban_members",
            Self::CreateInvites => "create_invites",
            Self::ManageGuild => "manage_guild",
            Self::AuditLog => "audit_log",
            Self::ManageMembers => "manage_members",
            Self::MuteMembers => "mute_members",
            Self::DeafenMembers => "deafen_members",
            Self::ViewChannel => "view_channel",
            Self::SendMessages => "send_messages",
            Self::ReadMessages => "read_messages",
            Self::ManageMessages => "manage_messages",
            Self::EmbedLinks => "embed_links",
            Self::AttachFiles => "attach_files",
            Self::ReadMessageHistory => "read_message_history",
            Self::MentionEveryone => "mention_everyone",
            Self::UseExternalEmojis => "use_external_emojis",
        }
    }

    /// Minimum level for a leveled check, if the permission has one.
    ///
    /// `None` means the permission is not part of the level table; leveled
    /// checks then fall open to [`PermissionLevel::Member`].
    pub fn required_level(self) -> Option<PermissionLevel> {
        match self {
            Self::BanMembers
            | Self::KickMembers
            | Self::ManageMembers
            | Self::ManageRoles
            | Self::ManageChannels
            | Self::ManageMessages => Some(PermissionLevel::Admin),
            Self::MuteMembers | Self::DeafenMembers => Some(PermissionLevel::Moderator),
            Self::SendMessages | Self::ReadMessages => Some(PermissionLevel::Member),
            _ => None,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = StoatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Permission::ALL
            .into_iter()
            .find(|permission| permission.as_str() == normalized)
            .ok_or_else(|| StoatError::invalid(format!("unknown permission '{s}'")))
    }
}

/// Set of discrete permission flags carried by a role.
pub type PermissionSet = BTreeSet<Permission>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(PermissionLevel::Owner > PermissionLevel::Admin);
        assert!(PermissionLevel::Admin > PermissionLevel::Moderator);
        assert!(PermissionLevel::Moderator > PermissionLevel::Member);
        assert_eq!(PermissionLevel::Owner.rank(), 3);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("BAN_MEMBERS".parse::<Permission>().unwrap(), Permission::BanMembers);
        assert_eq!(" mute_members ".parse::<Permission>().unwrap(), Permission::MuteMembers);
        assert!("launch_rockets".parse::<Permission>().is_err());
    }

    #[test]
    fn wire_names_round_trip() {
        for permission in Permission::ALL {
            assert_eq!(permission.as_str().parse::<Permission>().unwrap(), permission);
            let json = serde_json::to_string(&permission).unwrap();
            assert_eq!(json, format!("\"{}\"", permission.as_str()));
        }
    }

    #[test]
    fn level_table() {
        assert_eq!(Permission::BanMembers.required_level(), Some(PermissionLevel::Admin));
        assert_eq!(Permission::MuteMembers.required_level(), Some(PermissionLevel::Moderator));
        assert_eq!(Permission::SendMessages.required_level(), Some(PermissionLevel::Member));
        assert_eq!(Permission::Administrator.required_level(), None);
    }
}
