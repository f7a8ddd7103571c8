//! Messaging transport abstraction for parley.
//!
//! The engine talks to users only through a [`ReplySink`] scoped to one chat
//! and receives work as [`InboundEvent`]s. [`TelegramChannel`] is the concrete
//! transport: it long-polls the Bot API, filters senders and maps commands.
//!
//! # Main types
//!
//! - [`Channel`] — A transport that can hand out per-chat sinks.
//! - [`ReplySink`] — Outbound operations on one chat.
//! - [`InboundEvent`] — A parsed, authorized inbound interaction.
//! - [`UserFilter`] — Allow-list of numeric ids and usernames.
//! - [`TelegramChannel`] — Telegram Bot API adapter.

/// Core channel traits and event types.
pub mod channel;
/// Sender allow-list.
pub mod filter;
/// Telegram channel integration.
pub mod telegram;

pub use channel::{Channel, InboundEvent, InboundKind, MessageHandle, ReplySink, UpdateOutcome};
pub use filter::UserFilter;
pub use telegram::{PollOutcome, TelegramChannel, TelegramSink};
