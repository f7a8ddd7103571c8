use serde::{Deserialize, Serialize};

/// Events emitted during a streaming generation.
///
/// A backend sends zero or more [`StreamEvent::TextDelta`] fragments followed
/// by either [`StreamEvent::Done`] or [`StreamEvent::Error`]. The sequence is
/// finite and cannot be restarted; closing the channel without a terminal
/// event is equivalent to `Done`, with the join handle carrying any failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of generated text.
    TextDelta {
        text: String,
    },

    /// The backend signalled completion.
    Done,

    /// The backend failed mid-stream.
    Error {
        message: String,
    },
}
