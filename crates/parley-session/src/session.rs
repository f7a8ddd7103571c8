use crate::history::ChatHistory;
use chrono::{DateTime, Utc};
use parley_core::{ReplyMode, UserId};
use serde::{Deserialize, Serialize};

/// Everything the engine remembers about one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: UserId,
    pub history: ChatHistory,
    pub mode: ReplyMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session: empty history, [`ReplyMode::Text`].
    pub fn new(id: UserId, history_limit: usize) -> Self {
        let now = Utc::now();
        Self {
            id,
            history: ChatHistory::new(history_limit),
            mode: ReplyMode::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_exchange(&mut self, input: &str, output: &str) {
        self.updated_at = Utc::now();
        self.history.append(input, output);
    }

    pub fn set_mode(&mut self, mode: ReplyMode) {
        self.updated_at = Utc::now();
        self.mode = mode;
    }

    /// Starts a new conversation; the reply mode survives.
    pub fn clear_history(&mut self) {
        self.updated_at = Utc::now();
        self.history.clear();
    }
}
