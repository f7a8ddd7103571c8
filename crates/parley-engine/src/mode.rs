use parley_core::{ReplyMode, UserId};
use parley_session::SessionStore;
use std::sync::Arc;

/// Switches a user between text and voice replies.
///
/// The mode is read once when an exchange starts, so a change only affects
/// messages that arrive after it. Setting the current mode again is a no-op.
#[derive(Clone)]
pub struct ModeController {
    store: Arc<dyn SessionStore>,
}

impl ModeController {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn set_mode(&self, user: &UserId, mode: ReplyMode) {
        let previous = self.store.mode(user).await;
        self.store.set_mode(user, mode).await;
        if previous != mode {
            tracing::info!(user_id = %user, from = %previous, to = %mode, "Reply mode changed");
        }
    }

    pub async fn mode(&self, user: &UserId) -> ReplyMode {
        self.store.mode(user).await
    }
}
