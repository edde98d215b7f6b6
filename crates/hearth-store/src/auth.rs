//! Local accounts and the sign-in state machine.
//!
//! `signed_out -> signed_in -> signed_out`. Credentials live in one map keyed
//! by lowercased email; the active session is delegated to a
//! [`SessionRepository`]. This is a development stand-in for a hosted
//! identity provider: no token expiry and no multi-device sessions.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use thiserror::Error;

use hearth_shared::constants::{MIN_PASSWORD_LEN, MIN_USERNAME_LEN, NEW_USER_KEY, USERS_KEY};
use hearth_shared::credential::PasswordDigest;
use hearth_shared::types::UserId;

use crate::error::StoreError;
use crate::events::{EventBus, StoreEvent};
use crate::kv::{self, SharedKv};
use crate::models::{Credential, User, UserPatch};
use crate::session::SessionRepository;

type Credentials = BTreeMap<String, Credential>;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("User already exists with this email")]
    EmailTaken,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<T> From<std::sync::PoisonError<T>> for AuthError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        AuthError::Store(e.into())
    }
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Account operations plus an in-memory copy of the signed-in user.
///
/// Writes to the credential map hold `write_lock` across the whole
/// read-modify-write, so concurrent signups cannot drop each other.
pub struct SessionStore {
    kv: SharedKv,
    sessions: Arc<dyn SessionRepository>,
    events: EventBus,
    current: RwLock<Option<User>>,
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(kv: SharedKv, sessions: Arc<dyn SessionRepository>, events: EventBus) -> Self {
        Self {
            kv,
            sessions,
            events,
            current: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Reload the persisted session into memory and bring the authenticated
    /// marker in line with it.
    pub fn restore(&self) -> AuthResult<Option<User>> {
        let stored = self.sessions.get()?;
        match &stored {
            Some(user) => {
                self.sessions.set(user)?;
                tracing::debug!(user = %user.id, "restored session");
            }
            None => self.sessions.clear()?,
        }
        *self.current.write()? = stored.clone();
        Ok(stored)
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.read().ok().and_then(|c| c.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// True between signup and [`acknowledge_new_user`](Self::acknowledge_new_user).
    pub fn is_new_user(&self) -> AuthResult<bool> {
        Ok(kv::flag(self.kv.as_ref(), NEW_USER_KEY)?)
    }

    pub fn acknowledge_new_user(&self) -> AuthResult<()> {
        Ok(kv::set_flag(self.kv.as_ref(), NEW_USER_KEY, false)?)
    }

    pub fn login(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = email.trim().to_lowercase();
        let users = self.credentials()?;

        let record = users.get(&email).ok_or(AuthError::UserNotFound)?;
        if !record.password.verify(password) {
            tracing::debug!(%email, "login rejected: bad password");
            return Err(AuthError::InvalidPassword);
        }

        let user = record.user.clone();
        self.start_session(&user)?;
        kv::set_flag(self.kv.as_ref(), NEW_USER_KEY, false)?;

        tracing::info!(user = %user.id, "logged in");
        Ok(user)
    }

    pub fn signup(&self, email: &str, password: &str, username: &str) -> AuthResult<User> {
        let email = email.trim().to_lowercase();
        let username = username.trim();
        validate_signup(&email, password, username)?;

        let _w = self.write_lock.lock()?;
        let mut users = self.credentials()?;
        if users.contains_key(&email) {
            return Err(AuthError::EmailTaken);
        }
        let wanted = username.to_lowercase();
        if users
            .values()
            .any(|c| c.user.username.to_lowercase() == wanted)
        {
            return Err(AuthError::UsernameTaken);
        }

        let user = User {
            id: UserId::new(),
            email: email.clone(),
            username: username.to_string(),
            avatar_url: None,
            created_at: Utc::now(),
        };
        users.insert(
            email,
            Credential {
                password: PasswordDigest::create(password),
                user: user.clone(),
            },
        );
        kv::save(self.kv.as_ref(), USERS_KEY, &users)?;

        self.start_session(&user)?;
        kv::set_flag(self.kv.as_ref(), NEW_USER_KEY, true)?;

        tracing::info!(user = %user.id, username = %user.username, "signed up");
        Ok(user)
    }

    pub fn logout(&self) -> AuthResult<()> {
        let previous = self.current.write()?.take();
        self.sessions.clear()?;
        if let Some(user) = previous {
            tracing::info!(user = %user.id, "logged out");
        }
        self.events.publish(StoreEvent::SessionEnded);
        Ok(())
    }

    /// Merge `patch` into the session and into the stored credential entry.
    pub fn update_profile(&self, patch: &UserPatch) -> AuthResult<User> {
        let _w = self.write_lock.lock()?;
        let mut current = self.current.write()?;
        let user = current.as_mut().ok_or(AuthError::NotSignedIn)?;

        if let Some(name) = &patch.username {
            let wanted = name.trim().to_lowercase();
            if wanted.chars().count() < MIN_USERNAME_LEN {
                return Err(AuthError::Validation(format!(
                    "Username must be at least {MIN_USERNAME_LEN} characters"
                )));
            }
            let taken = self.credentials()?.values().any(|c| {
                c.user.id != user.id && c.user.username.to_lowercase() == wanted
            });
            if taken {
                return Err(AuthError::UsernameTaken);
            }
        }

        user.apply(patch);
        self.sessions.set(user)?;

        let mut users = self.credentials()?;
        if let Some(entry) = users.get_mut(&user.email) {
            entry.user = user.clone();
            kv::save(self.kv.as_ref(), USERS_KEY, &users)?;
        }

        self.events.publish(StoreEvent::ProfileUpdated { user_id: user.id });
        Ok(user.clone())
    }

    fn start_session(&self, user: &User) -> AuthResult<()> {
        self.sessions.set(user)?;
        *self.current.write()? = Some(user.clone());
        self.events.publish(StoreEvent::SessionStarted { user_id: user.id });
        Ok(())
    }

    fn credentials(&self) -> AuthResult<Credentials> {
        Ok(kv::load(self.kv.as_ref(), USERS_KEY)?)
    }
}

fn validate_signup(email: &str, password: &str, username: &str) -> AuthResult<()> {
    if email.is_empty() || password.is_empty() || username.is_empty() {
        return Err(AuthError::Validation("Please fill in all fields".into()));
    }
    if !email.contains('@') {
        return Err(AuthError::Validation("Invalid email address".into()));
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AuthError::Validation(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KeyValueStore, MemoryStore};
    use crate::session::KvSessionRepository;

    fn store() -> (SharedKv, SessionStore) {
        let kv: SharedKv = Arc::new(MemoryStore::new());
        let sessions = Arc::new(KvSessionRepository::new(kv.clone()));
        let store = SessionStore::new(kv.clone(), sessions, EventBus::new());
        (kv, store)
    }

    #[test]
    fn signup_then_login_returns_same_user() {
        let (_, s) = store();
        let created = s.signup("Ana@Example.com", "secret1", "ana").unwrap();
        assert_eq!(created.email, "ana@example.com");
        assert!(s.is_new_user().unwrap());

        s.logout().unwrap();
        assert!(!s.is_authenticated());

        let logged = s.login("ana@example.com", "secret1").unwrap();
        assert_eq!(logged.id, created.id);
        assert!(s.is_authenticated());
        assert!(!s.is_new_user().unwrap());
    }

    #[test]
    fn login_is_case_insensitive_on_email() {
        let (_, s) = store();
        let created = s.signup("bo@example.com", "secret1", "bo_b").unwrap();
        s.logout().unwrap();
        assert_eq!(s.login("  BO@EXAMPLE.COM", "secret1").unwrap().id, created.id);
    }

    #[test]
    fn unknown_email_does_not_touch_session() {
        let (kv, s) = store();
        let err = s.login("ghost@example.com", "whatever").unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
        assert!(s.current_user().is_none());
        assert_eq!(kv.get("current_user").unwrap(), None);
        assert_eq!(kv.get("is_authenticated").unwrap(), None);
    }

    #[test]
    fn failed_login_keeps_existing_session() {
        let (_, s) = store();
        let ana = s.signup("ana@example.com", "secret1", "ana").unwrap();
        let err = s.login("ana@example.com", "wrong!!").unwrap_err();
        assert!(matches!(err, AuthError::InvalidPassword));
        assert_eq!(s.current_user().map(|u| u.id), Some(ana.id));
    }

    #[test]
    fn duplicate_email_and_username_rejected() {
        let (_, s) = store();
        s.signup("ana@example.com", "secret1", "Ana").unwrap();
        assert!(matches!(
            s.signup("ANA@example.com", "secret2", "other"),
            Err(AuthError::EmailTaken)
        ));
        assert!(matches!(
            s.signup("new@example.com", "secret2", "aNA"),
            Err(AuthError::UsernameTaken)
        ));
    }

    #[test]
    fn signup_validation() {
        let (_, s) = store();
        assert!(matches!(
            s.signup("a@b.c", "secret1", "ab"),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            s.signup("a@b.c", "12345", "abc"),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            s.signup("", "secret1", "abc"),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            s.signup("no-at-sign", "secret1", "abc"),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn passwords_are_not_stored_in_clear() {
        let (kv, s) = store();
        s.signup("ana@example.com", "plaintext-pw", "ana").unwrap();
        let raw = kv.get(USERS_KEY).unwrap().unwrap();
        assert!(!raw.contains("plaintext-pw"));
    }

    #[test]
    fn logout_clears_every_session_key() {
        let (kv, s) = store();
        s.signup("ana@example.com", "secret1", "ana").unwrap();
        s.logout().unwrap();
        for key in hearth_shared::constants::SESSION_KEYS {
            assert_eq!(kv.get(key).unwrap(), None, "{key} left behind");
        }
        // the account itself survives
        assert!(kv.get(USERS_KEY).unwrap().is_some());
    }

    #[test]
    fn update_profile_reaches_session_and_credentials() {
        let (kv, s) = store();
        s.signup("ana@example.com", "secret1", "ana").unwrap();
        let patch = UserPatch {
            username: Some("ana_b".into()),
            avatar_url: Some(Some("https://img/a.png".into())),
        };
        let updated = s.update_profile(&patch).unwrap();
        assert_eq!(updated.username, "ana_b");

        let users: Credentials = kv::load(kv.as_ref(), USERS_KEY).unwrap();
        assert_eq!(users["ana@example.com"].user, updated);

        s.logout().unwrap();
        let again = s.login("ana@example.com", "secret1").unwrap();
        assert_eq!(again.username, "ana_b");
    }

    #[test]
    fn concurrent_signups_keep_every_credential() {
        let (kv, s) = store();
        std::thread::scope(|scope| {
            for i in 0..8 {
                let s = &s;
                scope.spawn(move || {
                    s.signup(&format!("user{i}@example.com"), "secret1", &format!("user{i}"))
                        .unwrap();
                });
            }
        });

        let users: Credentials = kv::load(kv.as_ref(), USERS_KEY).unwrap();
        assert_eq!(users.len(), 8);
        for i in 0..8 {
            s.login(&format!("user{i}@example.com"), "secret1").unwrap();
        }
    }

    #[test]
    fn concurrent_signups_cannot_share_a_username() {
        let (kv, s) = store();
        let wins = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let s = &s;
                    scope.spawn(move || {
                        s.signup(&format!("twin{i}@example.com"), "secret1", "twin")
                            .is_ok()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count()
        });
        assert_eq!(wins, 1);

        let users: Credentials = kv::load(kv.as_ref(), USERS_KEY).unwrap();
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn update_profile_requires_session() {
        let (_, s) = store();
        assert!(matches!(
            s.update_profile(&UserPatch::default()),
            Err(AuthError::NotSignedIn)
        ));
    }

    #[test]
    fn restore_picks_up_persisted_session() {
        let (kv, s) = store();
        let ana = s.signup("ana@example.com", "secret1", "ana").unwrap();

        let sessions = Arc::new(KvSessionRepository::new(kv.clone()));
        let fresh = SessionStore::new(kv.clone(), sessions, EventBus::new());
        assert!(fresh.current_user().is_none());
        assert_eq!(fresh.restore().unwrap().map(|u| u.id), Some(ana.id));
        assert!(fresh.is_authenticated());
    }

    #[test]
    fn session_events_are_published() {
        let kv: SharedKv = Arc::new(MemoryStore::new());
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let s = SessionStore::new(
            kv.clone(),
            Arc::new(KvSessionRepository::new(kv)),
            bus,
        );

        let ana = s.signup("ana@example.com", "secret1", "ana").unwrap();
        s.logout().unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::SessionStarted { user_id: ana.id }
        );
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::SessionEnded);
    }
}
