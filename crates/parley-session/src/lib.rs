//! Session state for parley: bounded per-user chat memory and the store that
//! owns it.
//!
//! # Main types
//!
//! - [`ChatHistory`] — Sliding window of the most recent conversation text.
//! - [`Session`] — One user's history and reply mode.
//! - [`SessionStore`] — Keyed access to sessions with per-user turn serialization.
//! - [`InMemorySessionStore`] — Process-lifetime store backed by a locked map.

/// Bounded, append-with-truncation chat memory.
pub mod history;
/// The per-user session record.
pub mod session;
/// Session store trait and in-memory implementation.
pub mod store;

pub use history::{ChatHistory, DEFAULT_HISTORY_LIMIT};
pub use session::Session;
pub use store::{InMemorySessionStore, SessionStore, TurnGuard};
