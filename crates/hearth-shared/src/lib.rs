//! # hearth-shared
//!
//! Types shared by the hearth store and its front ends: strongly typed
//! record identifiers, the fixed storage-key layout, invite codes and
//! credential digests.

pub mod constants;
pub mod credential;
pub mod invite;
pub mod types;
