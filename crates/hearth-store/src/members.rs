//! Group membership: raw CRUD plus the moderation actions (kick, ban, role
//! changes), which are checked against the acting user's rights.

use chrono::Utc;

use hearth_shared::constants::{GROUPS_KEY, GROUP_MEMBERS_KEY};
use hearth_shared::types::{GroupId, MemberId, UserId};

use crate::data::DataStore;
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::{Group, GroupMember, MemberPatch, MemberPermission, NewMember};
use crate::permissions;

impl DataStore {
    /// Add a membership row. A user can hold at most one row per group.
    pub fn add_group_member(&self, new: NewMember) -> Result<GroupMember> {
        let _w = self.writer()?;
        self.insert_member(new)
    }

    /// Merge `patch` into the membership with `id`.
    pub fn update_group_member(&self, id: MemberId, patch: &MemberPatch) -> Result<GroupMember> {
        let _w = self.writer()?;
        self.patch_member(id, patch)
    }

    /// Delete the membership with `id` and return it.
    pub fn remove_group_member(&self, id: MemberId) -> Result<GroupMember> {
        let _w = self.writer()?;
        self.delete_member(id)
    }

    /// Visible members of a group. Banned members are left out.
    pub fn get_group_members(&self, group_id: GroupId) -> Result<Vec<GroupMember>> {
        let members: Vec<GroupMember> = self.load(GROUP_MEMBERS_KEY)?;
        Ok(members
            .into_iter()
            .filter(|m| m.group_id == group_id && !m.is_banned)
            .collect())
    }

    /// The membership row of `user_id` in `group_id`, banned or not.
    pub fn get_user_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<Option<GroupMember>> {
        self.find_membership(group_id, user_id)
    }

    // ------------------------------------------------------------------
    // Moderation
    // ------------------------------------------------------------------

    /// Remove a member from their group. The member may join again.
    /// Banned members cannot be kicked: their row is what holds the ban.
    pub fn kick_member(&self, id: MemberId) -> Result<GroupMember> {
        let _w = self.writer()?;
        let (target, actor) = self.moderation_pair(id)?;
        if !permissions::can_kick_members(&actor) {
            return Err(StoreError::PermissionDenied("cannot kick members"));
        }
        guard_target(&actor, &target)?;
        if target.is_banned {
            return Err(StoreError::Conflict("member is banned"));
        }

        let removed = self.delete_member(id)?;
        tracing::info!(group = %removed.group_id, member = %id, by = %actor.user_id, "member kicked");
        Ok(removed)
    }

    /// Ban a member. The row stays so the ban sticks, but the member drops
    /// out of every member listing.
    pub fn ban_member(&self, id: MemberId) -> Result<GroupMember> {
        let _w = self.writer()?;
        let (target, actor) = self.moderation_pair(id)?;
        if !permissions::can_ban_members(&actor) {
            return Err(StoreError::PermissionDenied("cannot ban members"));
        }
        guard_target(&actor, &target)?;

        let banned = self.patch_member(
            id,
            &MemberPatch {
                is_banned: Some(true),
                ..MemberPatch::default()
            },
        )?;
        tracing::info!(group = %banned.group_id, member = %id, by = %actor.user_id, "member banned");
        Ok(banned)
    }

    /// Grant or revoke one right. Admins only.
    pub fn set_member_permission(
        &self,
        id: MemberId,
        permission: MemberPermission,
        value: bool,
    ) -> Result<GroupMember> {
        let _w = self.writer()?;
        let (_, actor) = self.moderation_pair(id)?;
        if !permissions::can_manage_roles(&actor) {
            return Err(StoreError::PermissionDenied("only admins can change roles"));
        }
        if actor.id == id && permission == MemberPermission::Admin && !value {
            return Err(StoreError::Validation("admins cannot demote themselves".into()));
        }
        self.patch_member(id, &permission.patch(value))
    }

    // ------------------------------------------------------------------
    // Unlocked helpers
    // ------------------------------------------------------------------

    pub(crate) fn find_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<Option<GroupMember>> {
        let members: Vec<GroupMember> = self.load(GROUP_MEMBERS_KEY)?;
        Ok(members
            .into_iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id))
    }

    /// Membership of `user_id` in `group_id`; not being a member is a
    /// permission failure.
    pub(crate) fn membership_of(&self, group_id: GroupId, user_id: UserId) -> Result<GroupMember> {
        self.find_membership(group_id, user_id)?
            .ok_or(StoreError::PermissionDenied("not a member of this group"))
    }

    pub(crate) fn insert_member(&self, new: NewMember) -> Result<GroupMember> {
        let groups: Vec<Group> = self.load(GROUPS_KEY)?;
        if !groups.iter().any(|g| g.id == new.group_id) {
            return Err(StoreError::NotFound("group"));
        }

        let mut members: Vec<GroupMember> = self.load(GROUP_MEMBERS_KEY)?;
        if members
            .iter()
            .any(|m| m.group_id == new.group_id && m.user_id == new.user_id)
        {
            return Err(StoreError::Conflict("user is already in this group"));
        }

        let member = GroupMember {
            id: MemberId::new(),
            group_id: new.group_id,
            user_id: new.user_id,
            rights: new.rights,
            is_banned: new.is_banned,
            joined_at: Utc::now(),
        };
        members.push(member.clone());
        self.save(GROUP_MEMBERS_KEY, &members)?;

        tracing::debug!(group = %member.group_id, user = %member.user_id, "member added");
        self.publish(StoreEvent::MemberAdded {
            group_id: member.group_id,
            member_id: member.id,
        });
        Ok(member)
    }

    fn patch_member(&self, id: MemberId, patch: &MemberPatch) -> Result<GroupMember> {
        let mut members: Vec<GroupMember> = self.load(GROUP_MEMBERS_KEY)?;
        let member = members
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound("group member"))?;
        member.apply(patch);
        let updated = member.clone();
        self.save(GROUP_MEMBERS_KEY, &members)?;

        self.publish(StoreEvent::MemberUpdated {
            group_id: updated.group_id,
            member_id: id,
        });
        Ok(updated)
    }

    fn delete_member(&self, id: MemberId) -> Result<GroupMember> {
        let mut members: Vec<GroupMember> = self.load(GROUP_MEMBERS_KEY)?;
        let pos = members
            .iter()
            .position(|m| m.id == id)
            .ok_or(StoreError::NotFound("group member"))?;
        let removed = members.remove(pos);
        self.save(GROUP_MEMBERS_KEY, &members)?;

        self.publish(StoreEvent::MemberRemoved {
            group_id: removed.group_id,
            member_id: id,
        });
        Ok(removed)
    }

    /// Target membership and the signed-in user's membership in the same
    /// group.
    fn moderation_pair(&self, target: MemberId) -> Result<(GroupMember, GroupMember)> {
        let user = self.require_user()?;
        let members: Vec<GroupMember> = self.load(GROUP_MEMBERS_KEY)?;
        let target = members
            .iter()
            .find(|m| m.id == target)
            .cloned()
            .ok_or(StoreError::NotFound("group member"))?;
        let actor = self.membership_of(target.group_id, user.id)?;
        if actor.is_banned {
            return Err(StoreError::PermissionDenied("banned from this group"));
        }
        Ok((target, actor))
    }
}

/// Nobody moderates themselves, and only admins act on admins.
fn guard_target(actor: &GroupMember, target: &GroupMember) -> Result<()> {
    if actor.id == target.id {
        return Err(StoreError::Validation("cannot moderate yourself".into()));
    }
    if target.rights.is_admin && !actor.rights.is_admin {
        return Err(StoreError::PermissionDenied("only admins can act on admins"));
    }
    Ok(())
}
