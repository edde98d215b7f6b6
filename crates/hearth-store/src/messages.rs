use chrono::Utc;

use hearth_shared::constants::GROUP_MESSAGES_KEY;
use hearth_shared::types::{GroupId, MessageId};

use crate::data::DataStore;
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::GroupMessage;
use crate::permissions;

impl DataStore {
    /// Post `content` to a group as the signed-in user.
    ///
    /// Returns `Ok(None)` without a session. The sender must be a member
    /// allowed to talk in the group.
    pub fn send_group_message(
        &self,
        group_id: GroupId,
        content: &str,
    ) -> Result<Option<GroupMessage>> {
        let Some(user) = self.session_user()? else {
            return Ok(None);
        };
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::Validation("Message cannot be empty".into()));
        }

        let _w = self.writer()?;
        let group = self
            .get_group_by_id(group_id)?
            .ok_or(StoreError::NotFound("group"))?;
        let membership = self.membership_of(group_id, user.id)?;
        if !permissions::can_send_messages(&group, &membership) {
            return Err(StoreError::PermissionDenied(
                "You don't have permission to send messages",
            ));
        }

        let message = GroupMessage {
            id: MessageId::new(),
            group_id,
            sender_id: user.id,
            content: content.to_string(),
            created_at: Utc::now(),
            reactions: Vec::new(),
        };
        let mut messages: Vec<GroupMessage> = self.load(GROUP_MESSAGES_KEY)?;
        messages.push(message.clone());
        self.save(GROUP_MESSAGES_KEY, &messages)?;

        tracing::debug!(group = %group_id, message = %message.id, "message sent");
        self.publish(StoreEvent::MessageSent {
            group_id,
            message_id: message.id,
        });
        Ok(Some(message))
    }

    /// Messages of a group, oldest first. Equal timestamps keep the order
    /// they were stored in.
    pub fn get_group_messages(&self, group_id: GroupId) -> Result<Vec<GroupMessage>> {
        let messages: Vec<GroupMessage> = self.load(GROUP_MESSAGES_KEY)?;
        let mut messages: Vec<GroupMessage> = messages
            .into_iter()
            .filter(|m| m.group_id == group_id)
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    pub fn get_message(&self, id: MessageId) -> Result<Option<GroupMessage>> {
        let messages: Vec<GroupMessage> = self.load(GROUP_MESSAGES_KEY)?;
        Ok(messages.into_iter().find(|m| m.id == id))
    }
}
