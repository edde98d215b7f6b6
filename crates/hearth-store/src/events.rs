//! Change notifications.
//!
//! Every successful mutation publishes a [`StoreEvent`] on a broadcast
//! channel so views can refresh on change instead of re-reading on a timer.

use serde::Serialize;
use tokio::sync::broadcast;

use hearth_shared::constants::EVENT_CHANNEL_CAPACITY;
use hearth_shared::types::{CallLogId, FriendshipId, GroupId, MemberId, MessageId, UserId};

use crate::models::FriendshipStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    SessionStarted { user_id: UserId },
    SessionEnded,
    ProfileUpdated { user_id: UserId },
    GroupCreated { group_id: GroupId },
    GroupUpdated { group_id: GroupId },
    MemberAdded { group_id: GroupId, member_id: MemberId },
    MemberUpdated { group_id: GroupId, member_id: MemberId },
    MemberRemoved { group_id: GroupId, member_id: MemberId },
    MessageSent { group_id: GroupId, message_id: MessageId },
    ReactionsChanged { group_id: GroupId, message_id: MessageId },
    FriendshipChanged { friendship_id: FriendshipId, status: FriendshipStatus },
    CallLogged { call_id: CallLogId },
    CallLogsCleared,
    DemoDataSeeded,
}

/// Cloneable publisher shared by the session and data stores.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: StoreEvent) {
        tracing::trace!(?event, "store event");
        // no subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_silent() {
        EventBus::new().publish(StoreEvent::SessionEnded);
    }

    #[test]
    fn every_subscriber_sees_each_event() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(StoreEvent::CallLogsCleared);

        assert_eq!(a.try_recv().unwrap(), StoreEvent::CallLogsCleared);
        assert_eq!(b.try_recv().unwrap(), StoreEvent::CallLogsCleared);
        assert!(a.try_recv().is_err());
    }

    #[test]
    fn events_serialize_with_a_tag() {
        let v = serde_json::to_value(StoreEvent::SessionEnded).unwrap();
        assert_eq!(v["event"], "session_ended");
    }
}
