//! One-time demo content for a fresh partition.
//!
//! Seeding runs the first time a session becomes active and is guarded by
//! the demo-initialized flag, so a partition is populated at most once no
//! matter how many users sign in afterwards. Every demo record has a fixed
//! id and is skipped when already present, so retrying after a failed seed
//! never duplicates anything.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use hearth_shared::constants::{
    CALL_LOGS_KEY, DEMO_INITIALIZED_KEY, FRIENDS_KEY, GROUP_MESSAGES_KEY, PROFILES_KEY,
};
use hearth_shared::types::{CallLogId, FriendshipId, GroupId, MessageId, UserId};

use crate::data::DataStore;
use crate::error::Result;
use crate::events::StoreEvent;
use crate::models::{
    CallDirection, CallKind, CallLog, Friendship, FriendshipStatus, GroupMessage, MemberRights,
    NewGroup, NewMember, Profile, Reaction,
};

struct DemoProfile {
    seq: u128,
    username: &'static str,
    bio: &'static str,
}

const DEMO_PROFILES: [DemoProfile; 5] = [
    DemoProfile {
        seq: 1,
        username: "alice",
        bio: "Coffee first, questions later.",
    },
    DemoProfile {
        seq: 2,
        username: "bruno",
        bio: "Weekend cyclist.",
    },
    DemoProfile {
        seq: 3,
        username: "chiara",
        bio: "Photos of other people's dogs.",
    },
    DemoProfile {
        seq: 4,
        username: "dmitri",
        bio: "Ask me about sourdough.",
    },
    DemoProfile {
        seq: 5,
        username: "emeka",
        bio: "Board games every Thursday.",
    },
];

const DEMO_GROUP_NAME: &str = "Weekend Plans";

const USER_TAG: u128 = 0;
const GROUP_TAG: u128 = 1;
const MESSAGE_TAG: u128 = 2;
const CALL_TAG: u128 = 3;

fn demo_uuid(tag: u128, seq: u128) -> Uuid {
    Uuid::from_u128(0x0000_de30_0000_4000_8000_0000_0000_0000 | (tag << 32) | seq)
}

/// Id of the `n`th demo profile, stable across partitions.
pub fn demo_user_id(seq: u128) -> UserId {
    UserId::from(demo_uuid(USER_TAG, seq))
}

fn demo_group_id() -> GroupId {
    GroupId::from(demo_uuid(GROUP_TAG, 1))
}

impl DataStore {
    /// Populate the partition with demo profiles, friendships, a group with
    /// some history and a call log for the signed-in user.
    ///
    /// Returns `Ok(false)` without a session or when the partition was
    /// already seeded.
    pub fn seed_demo_data(&self) -> Result<bool> {
        let Some(user) = self.session_user()? else {
            return Ok(false);
        };

        let _w = self.writer()?;
        if self.flag(DEMO_INITIALIZED_KEY)? {
            return Ok(false);
        }
        let now = Utc::now();

        // ---- profiles
        let mut profiles = self.profiles()?;
        for demo in &DEMO_PROFILES {
            let id = demo_user_id(demo.seq);
            if profiles.iter().any(|p| p.id == id) {
                continue;
            }
            profiles.push(Profile {
                id,
                username: demo.username.to_string(),
                avatar_url: None,
                bio: Some(demo.bio.to_string()),
            });
        }
        self.save(PROFILES_KEY, &profiles)?;

        // ---- friendships: two accepted, one waiting on the user
        let mut friends = self.friendships()?;
        let links = [
            (user.id, demo_user_id(1), FriendshipStatus::Accepted, 72),
            (demo_user_id(2), user.id, FriendshipStatus::Accepted, 48),
            (demo_user_id(3), user.id, FriendshipStatus::Pending, 2),
        ];
        for (sender_id, receiver_id, status, hours_ago) in links {
            if friends.iter().any(|f| f.links(sender_id, receiver_id)) {
                continue;
            }
            friends.push(Friendship {
                id: FriendshipId::new(),
                sender_id,
                receiver_id,
                status,
                created_at: now - Duration::hours(hours_ago),
            });
        }
        self.save(FRIENDS_KEY, &friends)?;

        // ---- a group run by a demo user, with the user as a plain member
        let owner = demo_user_id(1);
        let group_id = demo_group_id();
        if self.get_group_by_id(group_id)?.is_none() {
            self.insert_group_with_id(
                group_id,
                NewGroup {
                    description: Some("Who's in for Saturday?".to_string()),
                    ..NewGroup::named(DEMO_GROUP_NAME, owner)
                },
            )?;
        }
        let members = [
            (owner, MemberRights::owner()),
            (demo_user_id(2), MemberRights::default()),
            (demo_user_id(4), MemberRights::default()),
            (user.id, MemberRights::default()),
        ];
        for (member, rights) in members {
            if self.find_membership(group_id, member)?.is_none() {
                self.insert_member(NewMember {
                    rights,
                    ..NewMember::plain(group_id, member)
                })?;
            }
        }

        let script: [(UserId, &str, i64); 4] = [
            (demo_user_id(1), "Hike on Saturday? Forecast looks dry.", 180),
            (demo_user_id(2), "I'm in. Same trailhead as last time?", 150),
            (demo_user_id(4), "Bringing bread, obviously.", 95),
            (demo_user_id(1), "Meet at 9. Don't be late, Bruno.", 30),
        ];
        let mut messages: Vec<GroupMessage> = self.load(GROUP_MESSAGES_KEY)?;
        for (i, (sender_id, content, minutes_ago)) in script.into_iter().enumerate() {
            let id = MessageId::from(demo_uuid(MESSAGE_TAG, i as u128 + 1));
            if messages.iter().any(|m| m.id == id) {
                continue;
            }
            let reactions = if i == 2 {
                vec![Reaction {
                    user_id: demo_user_id(2),
                    emoji: "🍞".to_string(),
                }]
            } else {
                Vec::new()
            };
            messages.push(GroupMessage {
                id,
                group_id,
                sender_id,
                content: content.to_string(),
                created_at: now - Duration::minutes(minutes_ago),
                reactions,
            });
        }
        self.save(GROUP_MESSAGES_KEY, &messages)?;

        // ---- call history
        let mut logs: Vec<CallLog> = self.load(CALL_LOGS_KEY)?;
        for call in demo_calls(now) {
            if !logs.iter().any(|l| l.id == call.id) {
                logs.push(call);
            }
        }
        self.save(CALL_LOGS_KEY, &logs)?;

        self.set_flag(DEMO_INITIALIZED_KEY, true)?;
        tracing::info!(user = %user.id, group = %group_id, "demo data seeded");
        self.publish(StoreEvent::DemoDataSeeded);
        Ok(true)
    }
}

fn demo_calls(now: DateTime<Utc>) -> Vec<CallLog> {
    use CallDirection::{Incoming, Missed, Outgoing};
    use CallKind::{Video, Voice};

    let calls = [
        (1, Voice, Outgoing, Duration::minutes(30), Some(185)),
        (2, Video, Incoming, Duration::hours(2), Some(420)),
        (3, Voice, Missed, Duration::hours(5), None),
        (4, Video, Outgoing, Duration::hours(24), Some(60)),
        (5, Voice, Missed, Duration::hours(48), None),
        (1, Video, Incoming, Duration::hours(72), Some(900)),
        (2, Voice, Outgoing, Duration::hours(96), Some(45)),
    ];
    calls
        .into_iter()
        .zip(1u128..)
        .map(|((seq, kind, direction, ago, duration_secs), n)| CallLog {
            id: CallLogId::from(demo_uuid(CALL_TAG, n)),
            user_id: demo_user_id(seq),
            kind,
            direction,
            timestamp: now - ago,
            duration_secs,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::Fixture;

    #[test]
    fn seeds_once_per_partition() {
        let fx = Fixture::new();
        assert!(!fx.data.seed_demo_data().unwrap());

        let ana = fx.user("ana");
        assert!(fx.data.seed_demo_data().unwrap());
        let profiles = fx.data.profiles().unwrap().len();
        let logs = fx.data.call_logs().unwrap().len();

        fx.user("bo");
        assert!(!fx.data.seed_demo_data().unwrap());
        assert_eq!(fx.data.profiles().unwrap().len(), profiles + 1);
        assert_eq!(fx.data.call_logs().unwrap().len(), logs);

        fx.act_as(&ana);
        assert_eq!(fx.data.get_friends().unwrap().len(), 2);
        assert_eq!(fx.data.incoming_friend_requests().unwrap().len(), 1);
    }

    #[test]
    fn seeded_group_is_usable() {
        let fx = Fixture::new();
        let ana = fx.user("ana");
        fx.data.seed_demo_data().unwrap();

        let mine = fx.data.list_my_groups().unwrap();
        assert_eq!(mine.len(), 1);
        assert!(!mine[0].is_admin);
        let group = &mine[0].group;
        assert_eq!(group.name, DEMO_GROUP_NAME);
        assert_eq!(fx.data.get_group_members(group.id).unwrap().len(), 4);

        let history = fx.data.get_group_messages(group.id).unwrap();
        assert_eq!(history.len(), 4);
        assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let sent = fx.data.send_group_message(group.id, "count me in").unwrap().unwrap();
        assert_eq!(sent.sender_id, ana.id);
        assert_eq!(fx.data.get_group_messages(group.id).unwrap().last(), Some(&sent));
    }

    #[test]
    fn retrying_an_unfinished_seed_adds_nothing_twice() {
        let fx = Fixture::new();
        fx.user("ana");
        assert!(fx.data.seed_demo_data().unwrap());
        let counts = |fx: &Fixture| {
            let group = fx.data.list_my_groups().unwrap()[0].group.id;
            (
                fx.data.groups().unwrap().len(),
                fx.data.get_group_members(group).unwrap().len(),
                fx.data.get_group_messages(group).unwrap().len(),
                fx.data.call_logs().unwrap().len(),
                fx.data.friendships().unwrap().len(),
                fx.data.profiles().unwrap().len(),
            )
        };
        let before = counts(&fx);

        // a seed that failed before setting the flag
        fx.data.set_flag(DEMO_INITIALIZED_KEY, false).unwrap();
        assert!(fx.data.seed_demo_data().unwrap());
        assert_eq!(counts(&fx), before);
    }

    #[test]
    fn demo_ids_are_stable() {
        assert_eq!(demo_user_id(3), demo_user_id(3));
        assert_ne!(demo_user_id(1), demo_user_id(2));
    }
}
