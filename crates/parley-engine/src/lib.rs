//! Session engine for parley.
//!
//! Ties the session store, prompt builder and generation backend to a
//! transport. Each user's reply mode selects one of two responders:
//!
//! - [`StreamingResponder`] — edits a placeholder message as fragments arrive.
//! - [`AudioResponder`] — generates the whole reply, speaks it and sends one
//!   voice note.
//!
//! [`SessionEngine`] dispatches inbound events to them, records every exchange
//! in history and bounds how many events are handled at once.

/// Engine configuration and user-facing texts.
pub mod config;
/// The composition root and dispatcher.
pub mod engine;
/// Reply mode switching.
pub mod mode;
/// Responder outcomes.
pub mod outcome;

mod audio;
mod streaming;

pub use audio::AudioResponder;
pub use config::{EngineConfig, ReplyTexts};
pub use engine::SessionEngine;
pub use mode::ModeController;
pub use outcome::ResponseOutcome;
pub use streaming::StreamingResponder;
