//! CRUD operations for [`Group`] records.

use chrono::Utc;

use hearth_shared::constants::{GROUPS_KEY, GROUP_MEMBERS_KEY};
use hearth_shared::invite::{generate_invite_code, normalize_invite_code};
use hearth_shared::types::{GroupId, UserId};

use crate::data::DataStore;
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::{
    Group, GroupMember, GroupPatch, MemberRights, MyGroup, NewGroup, NewMember,
};
use crate::permissions;

impl DataStore {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new group with a fresh id and invite code.
    pub fn create_group(&self, new: NewGroup) -> Result<Group> {
        let _w = self.writer()?;
        self.insert_group(new)
    }

    /// Create a group owned by the signed-in user: the creator joins as
    /// admin with every right, each of `invitees` joins as an ordinary
    /// member.
    pub fn create_group_as_owner(&self, mut new: NewGroup, invitees: &[UserId]) -> Result<Group> {
        let user = self.require_user()?;
        new.created_by = user.id;

        let _w = self.writer()?;
        let group = self.insert_group(new)?;

        self.insert_member(NewMember {
            rights: MemberRights::owner(),
            ..NewMember::plain(group.id, user.id)
        })?;
        for &invitee in invitees {
            if invitee == user.id {
                continue;
            }
            match self.insert_member(NewMember::plain(group.id, invitee)) {
                Ok(_) | Err(StoreError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(group)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn groups(&self) -> Result<Vec<Group>> {
        self.load(GROUPS_KEY)
    }

    pub fn get_group_by_id(&self, id: GroupId) -> Result<Option<Group>> {
        Ok(self.groups()?.into_iter().find(|g| g.id == id))
    }

    /// Look a group up by invite code. Input is trimmed and uppercased;
    /// malformed codes simply match nothing.
    pub fn get_group_by_invite_code(&self, code: &str) -> Result<Option<Group>> {
        let Ok(code) = normalize_invite_code(code) else {
            return Ok(None);
        };
        Ok(self.groups()?.into_iter().find(|g| g.invite_code == code))
    }

    /// Groups the signed-in user belongs to and is not banned from.
    pub fn list_my_groups(&self) -> Result<Vec<MyGroup>> {
        let Some(user) = self.session_user()? else {
            return Ok(Vec::new());
        };
        let members: Vec<GroupMember> = self.load(GROUP_MEMBERS_KEY)?;

        let groups = self
            .groups()?
            .into_iter()
            .filter_map(|group| {
                let membership = members
                    .iter()
                    .find(|m| m.group_id == group.id && m.user_id == user.id)?;
                (!membership.is_banned).then(|| MyGroup {
                    is_admin: membership.rights.is_admin,
                    group,
                })
            })
            .collect();
        Ok(groups)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Merge `patch` into the group with `id`.
    pub fn update_group(&self, id: GroupId, patch: &GroupPatch) -> Result<Group> {
        let _w = self.writer()?;
        self.patch_group(id, patch)
    }

    /// [`update_group`](Self::update_group) on behalf of the signed-in user,
    /// who must be allowed to edit the group's settings.
    pub fn edit_group(&self, id: GroupId, patch: &GroupPatch) -> Result<Group> {
        let user = self.require_user()?;

        let _w = self.writer()?;
        let group = self
            .get_group_by_id(id)?
            .ok_or(StoreError::NotFound("group"))?;
        let membership = self.membership_of(id, user.id)?;
        if !permissions::can_edit_settings(&group, &membership) {
            return Err(StoreError::PermissionDenied("cannot edit group settings"));
        }
        self.patch_group(id, patch)
    }

    /// Join the group behind `invite_code` as an ordinary member. Joining a
    /// group twice returns the existing membership.
    pub fn join_group(&self, invite_code: &str) -> Result<GroupMember> {
        let user = self.require_user()?;
        let code = normalize_invite_code(invite_code)
            .map_err(|e| StoreError::Validation(e.to_string()))?;

        let _w = self.writer()?;
        let group = self
            .groups()?
            .into_iter()
            .find(|g| g.invite_code == code)
            .ok_or(StoreError::NotFound("group"))?;

        if let Some(existing) = self.find_membership(group.id, user.id)? {
            if existing.is_banned {
                return Err(StoreError::PermissionDenied("banned from this group"));
            }
            return Ok(existing);
        }

        let member = self.insert_member(NewMember::plain(group.id, user.id))?;
        tracing::info!(group = %group.id, user = %user.id, "joined group by invite");
        Ok(member)
    }

    // ------------------------------------------------------------------
    // Unlocked helpers
    // ------------------------------------------------------------------

    pub(crate) fn insert_group(&self, new: NewGroup) -> Result<Group> {
        self.insert_group_with_id(GroupId::new(), new)
    }

    pub(crate) fn insert_group_with_id(&self, id: GroupId, new: NewGroup) -> Result<Group> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("Please enter a group name".into()));
        }

        let mut groups = self.groups()?;
        let mut invite_code = generate_invite_code();
        while groups.iter().any(|g| g.invite_code == invite_code) {
            invite_code = generate_invite_code();
        }

        let group = Group {
            id,
            name: name.to_string(),
            description: new.description,
            avatar_url: new.avatar_url,
            created_by: new.created_by,
            invite_code,
            policy: new.policy,
            created_at: Utc::now(),
        };
        groups.push(group.clone());
        self.save(GROUPS_KEY, &groups)?;

        tracing::info!(group = %group.id, name = %group.name, "group created");
        self.publish(StoreEvent::GroupCreated { group_id: group.id });
        Ok(group)
    }

    fn patch_group(&self, id: GroupId, patch: &GroupPatch) -> Result<Group> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(StoreError::Validation("Group name cannot be empty".into()));
        }

        let mut groups = self.groups()?;
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound("group"))?;
        group.apply(patch);
        let updated = group.clone();
        self.save(GROUPS_KEY, &groups)?;

        self.publish(StoreEvent::GroupUpdated { group_id: id });
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use crate::data::test_support::Fixture;
    use crate::models::{GroupPolicy, NewMember};

    use super::*;

    #[test]
    fn create_group_assigns_code_and_default_policy() {
        let fx = Fixture::new();
        let ana = fx.user("ana");

        let g = fx.data.create_group(NewGroup::named("Test", ana.id)).unwrap();
        assert_eq!(g.invite_code.len(), 8);
        assert!(g
            .invite_code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert!(g.policy.allow_members_send_messages);
        assert!(!g.policy.allow_members_edit_settings);

        assert_eq!(fx.data.get_group_by_id(g.id).unwrap(), Some(g.clone()));
        assert_eq!(
            fx.data
                .get_group_by_invite_code(&g.invite_code.to_lowercase())
                .unwrap(),
            Some(g)
        );
    }

    #[test]
    fn blank_names_are_rejected() {
        let fx = Fixture::new();
        let ana = fx.user("ana");
        assert!(matches!(
            fx.data.create_group(NewGroup::named("   ", ana.id)),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn owner_flow_creates_admin_and_members() {
        let fx = Fixture::new();
        let bo = fx.user("bo");
        let cy = fx.user("cy");
        let ana = fx.user("ana");

        let g = fx
            .data
            .create_group_as_owner(NewGroup::named("Trip", UserId::new()), &[bo.id, cy.id, ana.id])
            .unwrap();
        assert_eq!(g.created_by, ana.id);

        let members = fx.data.get_group_members(g.id).unwrap();
        assert_eq!(members.len(), 3);
        let owner = fx.data.get_user_membership(g.id, ana.id).unwrap().unwrap();
        assert_eq!(owner.rights, MemberRights::owner());
        let plain = fx.data.get_user_membership(g.id, bo.id).unwrap().unwrap();
        assert_eq!(plain.rights, MemberRights::default());
    }

    #[test]
    fn update_group_merges_fields() {
        let fx = Fixture::new();
        let ana = fx.user("ana");
        let g = fx.data.create_group(NewGroup::named("Test", ana.id)).unwrap();

        let updated = fx
            .data
            .update_group(
                g.id,
                &GroupPatch {
                    description: Some(Some("weekend plans".into())),
                    ..GroupPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Test");
        assert_eq!(updated.description.as_deref(), Some("weekend plans"));
        assert_eq!(updated.invite_code, g.invite_code);

        assert!(matches!(
            fx.data.update_group(GroupId::new(), &GroupPatch::default()),
            Err(StoreError::NotFound("group"))
        ));
    }

    #[test]
    fn edit_group_respects_settings_permission() {
        let fx = Fixture::new();
        let bo = fx.user("bo");
        let ana = fx.user("ana");
        let g = fx
            .data
            .create_group_as_owner(NewGroup::named("Test", ana.id), &[bo.id])
            .unwrap();
        let rename = GroupPatch {
            name: Some("Renamed".into()),
            ..GroupPatch::default()
        };

        fx.act_as(&bo);
        assert!(matches!(
            fx.data.edit_group(g.id, &rename),
            Err(StoreError::PermissionDenied(_))
        ));

        fx.act_as(&ana);
        fx.data
            .edit_group(
                g.id,
                &GroupPatch {
                    policy: Some(GroupPolicy {
                        allow_members_edit_settings: true,
                        ..GroupPolicy::default()
                    }),
                    ..GroupPatch::default()
                },
            )
            .unwrap();

        fx.act_as(&bo);
        assert_eq!(fx.data.edit_group(g.id, &rename).unwrap().name, "Renamed");
    }

    #[test]
    fn join_by_invite_code() {
        let fx = Fixture::new();
        let ana = fx.user("ana");
        let g = fx
            .data
            .create_group_as_owner(NewGroup::named("Test", ana.id), &[])
            .unwrap();

        let bo = fx.user("bo");
        let m = fx
            .data
            .join_group(&format!(" {} ", g.invite_code.to_lowercase()))
            .unwrap();
        assert_eq!(m.user_id, bo.id);
        assert!(!m.rights.is_admin);

        let again = fx.data.join_group(&g.invite_code).unwrap();
        assert_eq!(again.id, m.id);
        assert_eq!(fx.data.get_group_members(g.id).unwrap().len(), 2);

        assert!(matches!(
            fx.data.join_group("ZZZZ9999"),
            Err(StoreError::NotFound("group"))
        ));
        assert!(matches!(
            fx.data.join_group("nope"),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn banned_users_cannot_rejoin() {
        let fx = Fixture::new();
        let ana = fx.user("ana");
        let g = fx.data.create_group(NewGroup::named("Test", ana.id)).unwrap();
        let bo = fx.user("bo");
        fx.data
            .add_group_member(NewMember {
                is_banned: true,
                ..NewMember::plain(g.id, bo.id)
            })
            .unwrap();

        assert!(matches!(
            fx.data.join_group(&g.invite_code),
            Err(StoreError::PermissionDenied(_))
        ));
    }

    #[test]
    fn my_groups_skip_banned_memberships() {
        let fx = Fixture::new();
        let ana = fx.user("ana");
        let kept = fx
            .data
            .create_group_as_owner(NewGroup::named("Kept", ana.id), &[])
            .unwrap();
        let other = fx.data.create_group(NewGroup::named("Other", ana.id)).unwrap();
        fx.data
            .add_group_member(NewMember {
                is_banned: true,
                ..NewMember::plain(other.id, ana.id)
            })
            .unwrap();
        fx.data.create_group(NewGroup::named("Unrelated", ana.id)).unwrap();

        let mine = fx.data.list_my_groups().unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].group.id, kept.id);
        assert!(mine[0].is_admin);

        fx.sign_out();
        assert!(fx.data.list_my_groups().unwrap().is_empty());
    }
}
