//! The relational store handle.
//!
//! [`DataStore`] owns nothing but a key-value handle and a session
//! repository; every collection is loaded whole, changed in memory and
//! written back whole. The per-entity operations live in sibling modules as
//! further `impl DataStore` blocks.
//!
//! Mutators serialize on an in-process write lock, so two threads sharing a
//! `DataStore` cannot interleave a read-modify-write. Two processes sharing
//! one partition still can; nothing here coordinates across processes.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::{Result, StoreError};
use crate::events::{EventBus, StoreEvent};
use crate::kv::{self, SharedKv};
use crate::models::User;
use crate::session::SessionRepository;

pub struct DataStore {
    kv: SharedKv,
    sessions: Arc<dyn SessionRepository>,
    events: EventBus,
    write_lock: Mutex<()>,
}

impl DataStore {
    pub fn new(kv: SharedKv, sessions: Arc<dyn SessionRepository>, events: EventBus) -> Self {
        Self {
            kv,
            sessions,
            events,
            write_lock: Mutex::new(()),
        }
    }

    /// Receive every change made through this store from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // Helpers shared by the entity modules
    // ------------------------------------------------------------------

    pub(crate) fn session_user(&self) -> Result<Option<User>> {
        self.sessions.get()
    }

    pub(crate) fn require_user(&self) -> Result<User> {
        self.session_user()?.ok_or(StoreError::NoSession)
    }

    pub(crate) fn load<T>(&self, key: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        kv::load(self.kv.as_ref(), key)
    }

    pub(crate) fn save<T>(&self, key: &str, records: &[T]) -> Result<()>
    where
        T: Serialize,
    {
        kv::save(self.kv.as_ref(), key, records)
    }

    pub(crate) fn flag(&self, key: &str) -> Result<bool> {
        kv::flag(self.kv.as_ref(), key)
    }

    pub(crate) fn set_flag(&self, key: &str, on: bool) -> Result<()> {
        kv::set_flag(self.kv.as_ref(), key, on)
    }

    /// Held for the whole read-modify-write of a mutator. Not reentrant:
    /// code running under the guard must call the unlocked helpers only.
    pub(crate) fn writer(&self) -> Result<MutexGuard<'_, ()>> {
        Ok(self.write_lock.lock()?)
    }

    pub(crate) fn publish(&self, event: StoreEvent) {
        self.events.publish(event);
    }
}
