//! # hearth-store
//!
//! Local persistence for the Hearth chat app: string-keyed storage
//! backends, the sign-in state machine, and a small relational layer over
//! groups, members, messages, friendships, profiles and call logs.
//!
//! Everything is synchronous. Collections are stored as whole JSON
//! documents, one per key, and every mutation publishes a [`StoreEvent`]
//! so consumers can react instead of polling.

pub mod auth;
pub mod backend;
pub mod data;
pub mod events;
pub mod kv;
pub mod migrations;
pub mod models;
pub mod permissions;
pub mod session;

mod call_logs;
mod error;
mod friends;
mod groups;
mod members;
mod messages;
mod profiles;
mod reactions;
mod seed;

pub use auth::{AuthError, AuthResult, SessionStore};
pub use backend::{Backend, BackendOptions};
pub use data::DataStore;
pub use error::{Result, StoreError};
pub use events::{EventBus, StoreEvent};
pub use kv::{FileStore, KeyValueStore, MemoryStore, SharedKv, SqliteStore};
pub use models::*;
pub use reactions::reaction_counts;
pub use seed::demo_user_id;
pub use session::{KvSessionRepository, SessionRepository};
