//! Core types and error definitions for the parley chat engine.
//!
//! This crate provides the foundational types shared across all parley crates:
//! the error taxonomy used at every backend boundary and the identity and mode
//! types that key per-user session state.
//!
//! # Main types
//!
//! - [`ParleyError`] — Unified error enum for all parley subsystems.
//! - [`ParleyResult`] — Convenience alias for `Result<T, ParleyError>`.
//! - [`UserId`] — Opaque, already-authorized user identity from the transport.
//! - [`ReplyMode`] — Whether a user receives streamed text or synthesized voice.

/// User identity and reply mode types.
pub mod identity;

pub use identity::{ReplyMode, UnknownReplyMode, UserId};

// --- Error types ---

/// Top-level error type for the parley engine.
///
/// Each variant corresponds to a subsystem that can produce errors. Responders
/// convert backend variants into fixed user-facing fallback messages; nothing
/// above the responder layer ever sees them.
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    /// The text-generation backend failed before or during generation.
    #[error("Inference error: {0}")]
    Inference(String),

    /// The speech-synthesis backend failed to produce an audio asset.
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Converting or measuring a synthesized audio asset failed.
    #[error("Transcode error: {0}")]
    Transcode(String),

    /// An error from the messaging transport (send, poll, upload).
    #[error("Channel error: {0}")]
    Channel(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`ParleyError`].
pub type ParleyResult<T> = Result<T, ParleyError>;
