//! Who may do what inside a group.
//!
//! Rights come from two places: the member's own flags and the group's
//! policy switches for ordinary members. A banned member has no rights.

use crate::models::{Group, GroupMember};

pub fn can_send_messages(group: &Group, member: &GroupMember) -> bool {
    !member.is_banned
        && (group.policy.allow_members_send_messages
            || member.rights.is_admin
            || member.rights.is_moderator)
}

pub fn can_edit_settings(group: &Group, member: &GroupMember) -> bool {
    !member.is_banned
        && (member.rights.is_admin
            || member.rights.can_edit_settings
            || group.policy.allow_members_edit_settings)
}

pub fn can_pin_messages(group: &Group, member: &GroupMember) -> bool {
    !member.is_banned
        && (member.rights.is_admin
            || member.rights.is_moderator
            || group.policy.allow_members_pin_messages)
}

pub fn can_add_members(group: &Group, member: &GroupMember) -> bool {
    !member.is_banned
        && (member.rights.is_admin
            || member.rights.is_moderator
            || group.policy.allow_members_add_others)
}

pub fn can_kick_members(member: &GroupMember) -> bool {
    !member.is_banned && (member.rights.is_admin || member.rights.can_kick_members)
}

pub fn can_ban_members(member: &GroupMember) -> bool {
    !member.is_banned && (member.rights.is_admin || member.rights.can_ban_members)
}

/// Granting or revoking roles is reserved for admins.
pub fn can_manage_roles(member: &GroupMember) -> bool {
    !member.is_banned && member.rights.is_admin
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use hearth_shared::types::{GroupId, MemberId, UserId};

    use super::*;
    use crate::models::{GroupPolicy, MemberRights};

    fn group(policy: GroupPolicy) -> Group {
        Group {
            id: GroupId::new(),
            name: "Test".into(),
            description: None,
            avatar_url: None,
            created_by: UserId::new(),
            invite_code: "AAAA1111".into(),
            policy,
            created_at: Utc::now(),
        }
    }

    fn member(rights: MemberRights) -> GroupMember {
        GroupMember {
            id: MemberId::new(),
            group_id: GroupId::new(),
            user_id: UserId::new(),
            rights,
            is_banned: false,
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn default_policy_lets_members_talk_but_not_edit() {
        let g = group(GroupPolicy::default());
        let m = member(MemberRights::default());
        assert!(can_send_messages(&g, &m));
        assert!(!can_edit_settings(&g, &m));
        assert!(!can_pin_messages(&g, &m));
        assert!(!can_add_members(&g, &m));
        assert!(!can_kick_members(&m));
        assert!(!can_ban_members(&m));
    }

    #[test]
    fn policy_switch_opens_settings_to_members() {
        let g = group(GroupPolicy {
            allow_members_edit_settings: true,
            ..GroupPolicy::default()
        });
        assert!(can_edit_settings(&g, &member(MemberRights::default())));
    }

    #[test]
    fn muted_group_still_lets_staff_talk() {
        let g = group(GroupPolicy {
            allow_members_send_messages: false,
            ..GroupPolicy::default()
        });
        assert!(!can_send_messages(&g, &member(MemberRights::default())));
        assert!(can_send_messages(&g, &member(MemberRights::owner())));
        let moderator = MemberRights {
            is_moderator: true,
            ..MemberRights::default()
        };
        assert!(can_send_messages(&g, &member(moderator)));
    }

    #[test]
    fn banned_members_have_no_rights() {
        let g = group(GroupPolicy::default());
        let mut m = member(MemberRights::owner());
        m.is_banned = true;
        assert!(!can_send_messages(&g, &m));
        assert!(!can_edit_settings(&g, &m));
        assert!(!can_kick_members(&m));
        assert!(!can_manage_roles(&m));
    }

    #[test]
    fn delegated_rights() {
        let kicker = member(MemberRights {
            can_kick_members: true,
            ..MemberRights::default()
        });
        assert!(can_kick_members(&kicker));
        assert!(!can_ban_members(&kicker));
        assert!(!can_manage_roles(&kicker));
    }
}
