//! Records persisted in the key-value partition.
//!
//! Every struct derives `Serialize` and `Deserialize`; the JSON shape is the
//! storage format. Relationships are plain ids with no foreign-key
//! enforcement beyond what the store's mutators check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hearth_shared::credential::PasswordDigest;
use hearth_shared::types::{CallLogId, FriendshipId, GroupId, MemberId, MessageId, UserId};

// ---------------------------------------------------------------------------
// User / credentials
// ---------------------------------------------------------------------------

/// The signed-in account, as held by the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Always stored lowercased.
    pub email: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Partial update for [`User`]. Id and email are immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub username: Option<String>,
    /// `Some(None)` clears the avatar.
    pub avatar_url: Option<Option<String>>,
}

impl User {
    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(avatar_url) = &patch.avatar_url {
            self.avatar_url = avatar_url.clone();
        }
    }
}

/// One entry of the credential map, keyed by lowercased email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub password: PasswordDigest,
    pub user: User,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Public face of a user. Shares its id with the [`User`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub avatar_url: Option<Option<String>>,
    pub bio: Option<Option<String>>,
}

impl Profile {
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(avatar_url) = &patch.avatar_url {
            self.avatar_url = avatar_url.clone();
        }
        if let Some(bio) = &patch.bio {
            self.bio = bio.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// Group-wide switches granting rights to every ordinary member.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupPolicy {
    pub allow_members_edit_settings: bool,
    pub allow_members_pin_messages: bool,
    pub allow_members_send_messages: bool,
    pub allow_members_add_others: bool,
    pub require_moderator_approval: bool,
}

impl Default for GroupPolicy {
    /// Members may talk; everything else is reserved for staff.
    fn default() -> Self {
        Self {
            allow_members_edit_settings: false,
            allow_members_pin_messages: false,
            allow_members_send_messages: true,
            allow_members_add_others: false,
            require_moderator_approval: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub created_by: UserId,
    pub invite_code: String,
    #[serde(flatten)]
    pub policy: GroupPolicy,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new group; id, invite code and timestamp are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub created_by: UserId,
    pub policy: GroupPolicy,
}

impl NewGroup {
    /// A group with default policy and no description or avatar.
    pub fn named(name: impl Into<String>, created_by: UserId) -> Self {
        Self {
            name: name.into(),
            description: None,
            avatar_url: None,
            created_by,
            policy: GroupPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub policy: Option<GroupPolicy>,
}

impl Group {
    pub fn apply(&mut self, patch: &GroupPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(avatar_url) = &patch.avatar_url {
            self.avatar_url = avatar_url.clone();
        }
        if let Some(policy) = patch.policy {
            self.policy = policy;
        }
    }
}

/// A group the current user belongs to, as listed on the groups page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MyGroup {
    pub group: Group,
    pub is_admin: bool,
}

// ---------------------------------------------------------------------------
// Group membership
// ---------------------------------------------------------------------------

/// Per-member role and rights.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberRights {
    pub is_admin: bool,
    pub is_moderator: bool,
    pub can_edit_settings: bool,
    pub can_ban_members: bool,
    pub can_kick_members: bool,
}

impl MemberRights {
    /// Rights given to a group's creator.
    pub fn owner() -> Self {
        Self {
            is_admin: true,
            is_moderator: false,
            can_edit_settings: true,
            can_ban_members: true,
            can_kick_members: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMember {
    pub id: MemberId,
    pub group_id: GroupId,
    pub user_id: UserId,
    #[serde(flatten)]
    pub rights: MemberRights,
    pub is_banned: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub rights: MemberRights,
    pub is_banned: bool,
}

impl NewMember {
    /// An ordinary member with no extra rights.
    pub fn plain(group_id: GroupId, user_id: UserId) -> Self {
        Self {
            group_id,
            user_id,
            rights: MemberRights::default(),
            is_banned: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberPatch {
    pub is_admin: Option<bool>,
    pub is_moderator: Option<bool>,
    pub can_edit_settings: Option<bool>,
    pub can_ban_members: Option<bool>,
    pub can_kick_members: Option<bool>,
    pub is_banned: Option<bool>,
}

impl GroupMember {
    pub fn apply(&mut self, patch: &MemberPatch) {
        let r = &mut self.rights;
        if let Some(v) = patch.is_admin {
            r.is_admin = v;
        }
        if let Some(v) = patch.is_moderator {
            r.is_moderator = v;
        }
        if let Some(v) = patch.can_edit_settings {
            r.can_edit_settings = v;
        }
        if let Some(v) = patch.can_ban_members {
            r.can_ban_members = v;
        }
        if let Some(v) = patch.can_kick_members {
            r.can_kick_members = v;
        }
        if let Some(v) = patch.is_banned {
            self.is_banned = v;
        }
    }
}

/// A single toggleable member right, as exposed on the member menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberPermission {
    Admin,
    Moderator,
    EditSettings,
    BanMembers,
    KickMembers,
}

impl MemberPermission {
    pub fn patch(self, value: bool) -> MemberPatch {
        let mut p = MemberPatch::default();
        match self {
            Self::Admin => p.is_admin = Some(value),
            Self::Moderator => p.is_moderator = Some(value),
            Self::EditSettings => p.can_edit_settings = Some(value),
            Self::BanMembers => p.can_ban_members = Some(value),
            Self::KickMembers => p.can_kick_members = Some(value),
        }
        p
    }
}

impl std::str::FromStr for MemberPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" | "is_admin" => Ok(Self::Admin),
            "moderator" | "is_moderator" => Ok(Self::Moderator),
            "edit-settings" | "can_edit_settings" => Ok(Self::EditSettings),
            "ban" | "can_ban_members" => Ok(Self::BanMembers),
            "kick" | "can_kick_members" => Ok(Self::KickMembers),
            other => Err(format!("unknown member permission: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Group message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub emoji: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMessage {
    pub id: MessageId,
    pub group_id: GroupId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// At most one entry per user.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<Reaction>,
}

// ---------------------------------------------------------------------------
// Friendship
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Friendship {
    pub id: FriendshipId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn involves(&self, user: UserId) -> bool {
        self.sender_id == user || self.receiver_id == user
    }

    /// True if this record links `a` and `b`, in either direction.
    pub fn links(&self, a: UserId, b: UserId) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }

    /// The other side of the friendship, if `user` is one side.
    pub fn other_party(&self, user: UserId) -> Option<UserId> {
        if self.sender_id == user {
            Some(self.receiver_id)
        } else if self.receiver_id == user {
            Some(self.sender_id)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Voice,
    Video,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Outgoing,
    Incoming,
    Missed,
}

/// Stored with the call-history field names (`userId`, `type`, `duration`),
/// like [`Reaction`] keeps `userId`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallLog {
    pub id: CallLogId,
    /// The other party of the call.
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: CallKind,
    pub direction: CallDirection,
    pub timestamp: DateTime<Utc>,
    /// Seconds. Missed calls have no duration.
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCallLog {
    pub user_id: UserId,
    pub kind: CallKind,
    pub direction: CallDirection,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: Option<u32>,
}
