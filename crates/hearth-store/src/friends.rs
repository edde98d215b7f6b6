//! Friend requests and the friend list.
//!
//! A pair of users shares at most one [`Friendship`] record, whichever side
//! asked first. The record moves from `pending` to `accepted` or
//! `rejected` and is never deleted.

use chrono::Utc;

use hearth_shared::constants::FRIENDS_KEY;
use hearth_shared::types::{FriendshipId, UserId};

use crate::data::DataStore;
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::{Friendship, FriendshipStatus, Profile};

impl DataStore {
    /// Ask `receiver_id` to be friends.
    ///
    /// Returns `Ok(None)` without a session, when addressed to oneself, or
    /// when a request already exists between the two users in either
    /// direction.
    pub fn send_friend_request(&self, receiver_id: UserId) -> Result<Option<Friendship>> {
        let Some(user) = self.session_user()? else {
            return Ok(None);
        };
        if receiver_id == user.id {
            return Ok(None);
        }

        let _w = self.writer()?;
        let mut friends = self.friendships()?;
        if friends.iter().any(|f| f.links(user.id, receiver_id)) {
            tracing::debug!(from = %user.id, to = %receiver_id, "friend request already exists");
            return Ok(None);
        }

        let request = Friendship {
            id: FriendshipId::new(),
            sender_id: user.id,
            receiver_id,
            status: FriendshipStatus::Pending,
            created_at: Utc::now(),
        };
        friends.push(request.clone());
        self.save(FRIENDS_KEY, &friends)?;

        self.publish(StoreEvent::FriendshipChanged {
            friendship_id: request.id,
            status: request.status,
        });
        Ok(Some(request))
    }

    /// Accept a pending request. Either side of the pair may accept.
    pub fn accept_friend_request(&self, id: FriendshipId) -> Result<Friendship> {
        self.set_friendship_status(id, FriendshipStatus::Accepted)
    }

    pub fn reject_friend_request(&self, id: FriendshipId) -> Result<Friendship> {
        self.set_friendship_status(id, FriendshipStatus::Rejected)
    }

    /// Profiles of everyone the signed-in user is friends with.
    pub fn get_friends(&self) -> Result<Vec<Profile>> {
        let Some(user) = self.session_user()? else {
            return Ok(Vec::new());
        };
        let friend_ids: Vec<UserId> = self
            .friendships()?
            .iter()
            .filter(|f| f.status == FriendshipStatus::Accepted)
            .filter_map(|f| f.other_party(user.id))
            .collect();

        Ok(self
            .profiles()?
            .into_iter()
            .filter(|p| friend_ids.contains(&p.id))
            .collect())
    }

    /// Pending requests addressed to the signed-in user.
    pub fn incoming_friend_requests(&self) -> Result<Vec<Friendship>> {
        let Some(user) = self.session_user()? else {
            return Ok(Vec::new());
        };
        Ok(self
            .friendships()?
            .into_iter()
            .filter(|f| f.status == FriendshipStatus::Pending && f.receiver_id == user.id)
            .collect())
    }

    /// The record linking the signed-in user and `other`, if any.
    pub fn friendship_with(&self, other: UserId) -> Result<Option<Friendship>> {
        let Some(user) = self.session_user()? else {
            return Ok(None);
        };
        Ok(self
            .friendships()?
            .into_iter()
            .find(|f| f.links(user.id, other)))
    }

    pub fn friendships(&self) -> Result<Vec<Friendship>> {
        self.load(FRIENDS_KEY)
    }

    fn set_friendship_status(&self, id: FriendshipId, status: FriendshipStatus) -> Result<Friendship> {
        let user = self.require_user()?;

        let _w = self.writer()?;
        let mut friends = self.friendships()?;
        let request = friends
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(StoreError::NotFound("friend request"))?;
        if !request.involves(user.id) {
            return Err(StoreError::PermissionDenied("not part of this friend request"));
        }
        if request.status != FriendshipStatus::Pending {
            return Err(StoreError::Conflict("friend request was already answered"));
        }

        request.status = status;
        let updated = request.clone();
        self.save(FRIENDS_KEY, &friends)?;

        tracing::info!(friendship = %id, ?status, by = %user.id, "friend request answered");
        self.publish(StoreEvent::FriendshipChanged {
            friendship_id: id,
            status,
        });
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::Fixture;

    #[test]
    fn opposite_requests_collapse_into_one() {
        let fx = Fixture::new();
        let bo = fx.user("bo");
        let ana = fx.user("ana");

        let first = fx.data.send_friend_request(bo.id).unwrap().unwrap();
        fx.act_as(&bo);
        assert_eq!(fx.data.send_friend_request(ana.id).unwrap(), None);

        let all = fx.data.friendships().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, first.id);
    }

    #[test]
    fn either_party_may_accept() {
        for sender_accepts in [false, true] {
            let fx = Fixture::new();
            let bo = fx.user("bo");
            let ana = fx.user("ana");

            let req = fx.data.send_friend_request(bo.id).unwrap().unwrap();
            fx.act_as(&bo);
            fx.data.send_friend_request(ana.id).unwrap();

            fx.act_as(if sender_accepts { &ana } else { &bo });
            let accepted = fx.data.accept_friend_request(req.id).unwrap();
            assert_eq!(accepted.status, FriendshipStatus::Accepted);

            let all = fx.data.friendships().unwrap();
            assert_eq!(all.len(), 1);
            assert_eq!(all[0].status, FriendshipStatus::Accepted);

            let friends = fx.data.get_friends().unwrap();
            assert_eq!(friends.len(), 1);
            let expected = if sender_accepts { bo.id } else { ana.id };
            assert_eq!(friends[0].id, expected);
        }
    }

    #[test]
    fn outsiders_cannot_answer() {
        let fx = Fixture::new();
        let bo = fx.user("bo");
        let ana = fx.user("ana");
        let req = fx.data.send_friend_request(bo.id).unwrap().unwrap();

        fx.user("eve");
        assert!(matches!(
            fx.data.accept_friend_request(req.id),
            Err(StoreError::PermissionDenied(_))
        ));
        assert!(matches!(
            fx.data.accept_friend_request(FriendshipId::new()),
            Err(StoreError::NotFound(_))
        ));

        fx.act_as(&ana);
        assert_eq!(
            fx.data.friendship_with(bo.id).unwrap().map(|f| f.status),
            Some(FriendshipStatus::Pending)
        );
    }

    #[test]
    fn rejected_requests_are_kept_and_block_new_ones() {
        let fx = Fixture::new();
        let bo = fx.user("bo");
        let ana = fx.user("ana");
        let req = fx.data.send_friend_request(bo.id).unwrap().unwrap();

        fx.act_as(&bo);
        assert_eq!(fx.data.incoming_friend_requests().unwrap(), vec![req.clone()]);
        fx.data.reject_friend_request(req.id).unwrap();
        assert!(fx.data.incoming_friend_requests().unwrap().is_empty());
        assert!(fx.data.get_friends().unwrap().is_empty());

        fx.act_as(&ana);
        assert_eq!(fx.data.send_friend_request(bo.id).unwrap(), None);
        assert_eq!(fx.data.friendships().unwrap().len(), 1);
    }

    #[test]
    fn answered_requests_cannot_be_answered_again() {
        let fx = Fixture::new();
        let bo = fx.user("bo");
        let ana = fx.user("ana");
        let req = fx.data.send_friend_request(bo.id).unwrap().unwrap();

        fx.act_as(&bo);
        fx.data.reject_friend_request(req.id).unwrap();

        fx.act_as(&ana);
        assert!(matches!(
            fx.data.accept_friend_request(req.id),
            Err(StoreError::Conflict(_))
        ));
        assert!(fx.data.get_friends().unwrap().is_empty());

        fx.act_as(&bo);
        assert!(matches!(
            fx.data.accept_friend_request(req.id),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(
            fx.data.friendships().unwrap()[0].status,
            FriendshipStatus::Rejected
        );
    }

    #[test]
    fn no_session_and_self_requests_are_no_ops() {
        let fx = Fixture::new();
        let ana = fx.user("ana");
        assert_eq!(fx.data.send_friend_request(ana.id).unwrap(), None);

        fx.sign_out();
        assert_eq!(fx.data.send_friend_request(UserId::new()).unwrap(), None);
        assert!(fx.data.get_friends().unwrap().is_empty());
        assert!(fx.data.friendships().unwrap().is_empty());
    }
}
