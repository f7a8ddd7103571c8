use async_trait::async_trait;
use parley_core::{ParleyResult, ReplyMode, UserId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Identifies a message already sent, so it can be edited later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle {
    pub chat_id: String,
    pub message_id: i64,
}

/// Result of editing a sent message.
///
/// Transports refuse edits that change nothing or that race another edit.
/// That is an expected outcome while streaming, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    Rejected { reason: String },
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

/// Outbound operations on a single chat.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Send an interim message whose handle is kept for later edits.
    async fn send_placeholder(&self, text: &str) -> ParleyResult<MessageHandle>;

    /// Replace the text of a previously sent message.
    async fn update_message(&self, handle: &MessageHandle, text: &str) -> UpdateOutcome;

    async fn send_text(&self, text: &str) -> ParleyResult<()>;

    /// Deliver an audio file as a voice note.
    async fn send_voice(&self, path: &Path, duration: Duration) -> ParleyResult<()>;

    /// Show a "typing…" indicator.
    async fn send_typing(&self) -> ParleyResult<()>;

    /// Offer the reply-mode choices, marking `current`.
    async fn send_mode_menu(&self, current: ReplyMode) -> ParleyResult<()>;
}

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    /// Ordinary chat text to answer.
    Text(String),
    /// First contact (`/start`).
    Start,
    /// Forget the conversation (`/new_chat`).
    NewConversation,
    /// Ask for the reply-mode menu (`/mode`).
    ModeMenu,
    /// A reply mode was picked from the menu.
    SelectMode(ReplyMode),
    /// A voice note was sent.
    Voice,
}

/// An inbound interaction from an already authorized user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Session key.
    pub user_id: UserId,
    /// Where replies go.
    pub chat_id: String,
    pub sender_name: Option<String>,
    pub kind: InboundKind,
}

/// A messaging platform.
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// A sink replying into `chat_id`.
    fn sink(&self, chat_id: &str) -> Arc<dyn ReplySink>;
}
