//! Persisted "who is signed in" state.
//!
//! [`SessionRepository`] is the only way the rest of the crate reads or
//! writes the current session, so the storage medium can change without
//! touching call sites.

use hearth_shared::constants::{AUTHENTICATED_KEY, CURRENT_USER_KEY, SESSION_KEYS};

use crate::error::Result;
use crate::kv::{self, SharedKv};
use crate::models::User;

pub trait SessionRepository: Send + Sync {
    /// The signed-in user, if any.
    fn get(&self) -> Result<Option<User>>;

    /// Record `user` as signed in.
    fn set(&self, user: &User) -> Result<()>;

    /// Forget the session and every marker tied to it.
    fn clear(&self) -> Result<()>;

    fn is_authenticated(&self) -> Result<bool> {
        Ok(self.get()?.is_some())
    }
}

/// Session kept in the shared key-value partition.
#[derive(Clone)]
pub struct KvSessionRepository {
    kv: SharedKv,
}

impl KvSessionRepository {
    pub fn new(kv: SharedKv) -> Self {
        Self { kv }
    }
}

impl SessionRepository for KvSessionRepository {
    fn get(&self) -> Result<Option<User>> {
        kv::load::<Option<User>>(self.kv.as_ref(), CURRENT_USER_KEY)
    }

    fn set(&self, user: &User) -> Result<()> {
        kv::save(self.kv.as_ref(), CURRENT_USER_KEY, user)?;
        kv::set_flag(self.kv.as_ref(), AUTHENTICATED_KEY, true)
    }

    fn clear(&self) -> Result<()> {
        for key in SESSION_KEYS {
            self.kv.remove(key)?;
        }
        Ok(())
    }

    fn is_authenticated(&self) -> Result<bool> {
        kv::flag(self.kv.as_ref(), AUTHENTICATED_KEY)
    }
}
