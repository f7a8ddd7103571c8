use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier of a user as supplied by the transport.
///
/// The engine never inspects it; authorization has already happened by the
/// time an event carries one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a transport handle.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How replies are delivered to a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    /// Incrementally streamed text edits of a placeholder message.
    #[default]
    Text,
    /// A single synthesized voice note.
    Voice,
}

impl ReplyMode {
    /// Every mode, in menu order.
    pub const ALL: [ReplyMode; 2] = [ReplyMode::Text, ReplyMode::Voice];

    /// Stable lowercase name, also used in callback payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyMode::Text => "text",
            ReplyMode::Voice => "voice",
        }
    }

    /// Human-readable label for menus.
    pub fn label(self) -> &'static str {
        match self {
            ReplyMode::Text => "Text",
            ReplyMode::Voice => "Voice",
        }
    }
}

impl fmt::Display for ReplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known [`ReplyMode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reply mode: {0}")]
pub struct UnknownReplyMode(pub String);

impl FromStr for ReplyMode {
    type Err = UnknownReplyMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ReplyMode::Text),
            "voice" => Ok(ReplyMode::Voice),
            other => Err(UnknownReplyMode(other.to_string())),
        }
    }
}
