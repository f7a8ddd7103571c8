use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::session::Session;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use parley_core::{ReplyMode, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Held for the whole of one exchange; while it lives no other exchange for
/// the same user can start.
pub type TurnGuard = OwnedMutexGuard<()>;

/// Keyed access to per-user sessions.
///
/// A user without an entry is in the defined initial state (empty history,
/// text mode); every method creates the entry on first use.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Snapshot of the user's session, created if missing.
    async fn get_or_create(&self, user: &UserId) -> Session;

    async fn set_mode(&self, user: &UserId, mode: ReplyMode);

    async fn mode(&self, user: &UserId) -> ReplyMode;

    async fn history(&self, user: &UserId) -> String;

    /// Appends `" {input} {output}"` and truncates to the history bound.
    async fn append_exchange(&self, user: &UserId, input: &str, output: &str);

    async fn clear_history(&self, user: &UserId);

    /// Waits until no other exchange for `user` is in flight and returns a
    /// guard serializing the caller's exchange against later ones.
    async fn begin_turn(&self, user: &UserId) -> TurnGuard;
}

struct SessionSlot {
    state: Mutex<Session>,
    turn: Arc<tokio::sync::Mutex<()>>,
}

/// Process-lifetime session store.
///
/// The outer map is only write-locked to insert a new user. Each user's state
/// sits behind its own short synchronous lock, and exchanges are serialized by
/// a separate async turn lock so mode toggles never wait on a generation.
pub struct InMemorySessionStore {
    history_limit: usize,
    slots: RwLock<HashMap<UserId, Arc<SessionSlot>>>,
}

impl InMemorySessionStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            history_limit,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Number of users seen so far.
    pub fn session_count(&self) -> usize {
        self.slots.read().len()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    fn slot(&self, user: &UserId) -> Arc<SessionSlot> {
        if let Some(slot) = self.slots.read().get(user) {
            return slot.clone();
        }
        let mut slots = self.slots.write();
        slots
            .entry(user.clone())
            .or_insert_with(|| {
                tracing::debug!(user_id = %user, "Session created");
                Arc::new(SessionSlot {
                    state: Mutex::new(Session::new(user.clone(), self.history_limit)),
                    turn: Arc::new(tokio::sync::Mutex::new(())),
                })
            })
            .clone()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, user: &UserId) -> Session {
        self.slot(user).state.lock().clone()
    }

    async fn set_mode(&self, user: &UserId, mode: ReplyMode) {
        self.slot(user).state.lock().set_mode(mode);
    }

    async fn mode(&self, user: &UserId) -> ReplyMode {
        self.slot(user).state.lock().mode
    }

    async fn history(&self, user: &UserId) -> String {
        self.slot(user).state.lock().history.read().to_string()
    }

    async fn append_exchange(&self, user: &UserId, input: &str, output: &str) {
        self.slot(user).state.lock().record_exchange(input, output);
    }

    async fn clear_history(&self, user: &UserId) {
        self.slot(user).state.lock().clear_history();
    }

    async fn begin_turn(&self, user: &UserId) -> TurnGuard {
        let turn = self.slot(user).turn.clone();
        turn.lock_owned().await
    }
}
