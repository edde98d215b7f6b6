//! One handle over the whole local backend.
//!
//! [`Backend`] wires a [`SessionStore`] and a [`DataStore`] to the same
//! key-value partition and event bus. Signing in through the backend also
//! activates the session on the data side: the user's profile is created if
//! missing and, when enabled, demo data is seeded.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::auth::{AuthResult, SessionStore};
use crate::data::DataStore;
use crate::events::{EventBus, StoreEvent};
use crate::kv::SharedKv;
use crate::models::{ProfilePatch, User, UserPatch};
use crate::session::{KvSessionRepository, SessionRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendOptions {
    /// Seed demo content the first time a session becomes active.
    pub seed_demo: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self { seed_demo: true }
    }
}

pub struct Backend {
    session: SessionStore,
    data: DataStore,
    events: EventBus,
    options: BackendOptions,
}

impl Backend {
    /// Open the backend over `kv`, restoring any persisted session.
    pub fn open(kv: SharedKv, options: BackendOptions) -> AuthResult<Self> {
        let events = EventBus::new();
        let sessions: Arc<dyn SessionRepository> = Arc::new(KvSessionRepository::new(kv.clone()));

        let backend = Self {
            session: SessionStore::new(kv.clone(), sessions.clone(), events.clone()),
            data: DataStore::new(kv, sessions, events.clone()),
            events,
            options,
        };

        if let Some(user) = backend.session.restore()? {
            backend.activate(&user)?;
        }
        Ok(backend)
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn data(&self) -> &DataStore {
        &self.data
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn login(&self, email: &str, password: &str) -> AuthResult<User> {
        let user = self.session.login(email, password)?;
        self.activate(&user)?;
        Ok(user)
    }

    pub fn signup(&self, email: &str, password: &str, username: &str) -> AuthResult<User> {
        let user = self.session.signup(email, password, username)?;
        self.activate(&user)?;
        Ok(user)
    }

    pub fn logout(&self) -> AuthResult<()> {
        self.session.logout()
    }

    /// Update the account and mirror the public fields onto the profile.
    pub fn update_profile(&self, patch: &UserPatch) -> AuthResult<User> {
        let user = self.session.update_profile(patch)?;
        self.data.sync_profile()?;
        self.data.update_my_profile(&ProfilePatch {
            username: patch.username.clone(),
            avatar_url: patch.avatar_url.clone(),
            bio: None,
        })?;
        Ok(user)
    }

    fn activate(&self, user: &User) -> AuthResult<()> {
        self.data.sync_profile()?;
        if self.options.seed_demo && self.data.seed_demo_data()? {
            tracing::debug!(user = %user.id, "seeded demo data on first activation");
        }
        Ok(())
    }
}
