use std::collections::BTreeMap;

use hearth_shared::constants::GROUP_MESSAGES_KEY;
use hearth_shared::types::{MessageId, UserId};

use crate::data::DataStore;
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::{GroupMessage, Reaction};

impl DataStore {
    /// React to a message as the signed-in user, replacing any earlier
    /// reaction of theirs. Returns `Ok(None)` without a session.
    pub fn react_to_message(
        &self,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<Option<GroupMessage>> {
        let Some(user) = self.session_user()? else {
            return Ok(None);
        };
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return Err(StoreError::Validation("Reaction cannot be empty".into()));
        }

        let _w = self.writer()?;
        self.edit_reactions(message_id, user.id, |reactions| {
            reactions.retain(|r| r.user_id != user.id);
            reactions.push(Reaction {
                user_id: user.id,
                emoji: emoji.to_string(),
            });
        })
        .map(Some)
    }

    /// Drop the signed-in user's reaction, if any.
    pub fn remove_reaction(&self, message_id: MessageId) -> Result<Option<GroupMessage>> {
        let Some(user) = self.session_user()? else {
            return Ok(None);
        };

        let _w = self.writer()?;
        self.edit_reactions(message_id, user.id, |reactions| {
            reactions.retain(|r| r.user_id != user.id);
        })
        .map(Some)
    }

    fn edit_reactions(
        &self,
        message_id: MessageId,
        user_id: UserId,
        edit: impl FnOnce(&mut Vec<Reaction>),
    ) -> Result<GroupMessage> {
        let mut messages: Vec<GroupMessage> = self.load(GROUP_MESSAGES_KEY)?;
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(StoreError::NotFound("message"))?;

        let membership = self.membership_of(message.group_id, user_id)?;
        if membership.is_banned {
            return Err(StoreError::PermissionDenied("banned from this group"));
        }

        edit(&mut message.reactions);
        let updated = message.clone();
        self.save(GROUP_MESSAGES_KEY, &messages)?;

        self.publish(StoreEvent::ReactionsChanged {
            group_id: updated.group_id,
            message_id,
        });
        Ok(updated)
    }
}

/// How many users picked each emoji on `message`.
pub fn reaction_counts(message: &GroupMessage) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for r in &message.reactions {
        *counts.entry(r.emoji.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::Fixture;
    use crate::models::NewGroup;

    #[test]
    fn one_reaction_per_user() {
        let fx = Fixture::new();
        let bo = fx.user("bo");
        let ana = fx.user("ana");
        let g = fx
            .data
            .create_group_as_owner(NewGroup::named("Test", ana.id), &[bo.id])
            .unwrap();
        let msg = fx.data.send_group_message(g.id, "hello").unwrap().unwrap();

        fx.data.react_to_message(msg.id, "👍").unwrap();
        fx.data.react_to_message(msg.id, "❤️").unwrap();
        fx.act_as(&bo);
        let msg = fx.data.react_to_message(msg.id, "❤️").unwrap().unwrap();

        assert_eq!(msg.reactions.len(), 2);
        let counts = reaction_counts(&msg);
        assert_eq!(counts.get("❤️"), Some(&2));
        assert_eq!(counts.get("👍"), None);

        let msg = fx.data.remove_reaction(msg.id).unwrap().unwrap();
        assert_eq!(msg.reactions.len(), 1);
        assert_eq!(msg.reactions[0].user_id, ana.id);

        // persisted, not just returned
        let stored = fx.data.get_message(msg.id).unwrap().unwrap();
        assert_eq!(stored.reactions, msg.reactions);
    }

    #[test]
    fn reacting_needs_session_membership_and_message() {
        let fx = Fixture::new();
        let ana = fx.user("ana");
        let g = fx
            .data
            .create_group_as_owner(NewGroup::named("Test", ana.id), &[])
            .unwrap();
        let msg = fx.data.send_group_message(g.id, "hello").unwrap().unwrap();

        assert!(matches!(
            fx.data.react_to_message(MessageId::new(), "👍"),
            Err(StoreError::NotFound("message"))
        ));

        fx.user("stranger");
        assert!(matches!(
            fx.data.react_to_message(msg.id, "👍"),
            Err(StoreError::PermissionDenied(_))
        ));

        fx.sign_out();
        assert_eq!(fx.data.react_to_message(msg.id, "👍").unwrap(), None);
    }
}
