//! In-memory per-user sessions
//!
//! Sessions live only as long as the process. Each one sits behind its own
//! async mutex, held by the handler for the whole of one message, so two
//! messages from the same user never interleave.

use crate::state_machine::Session;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub type SessionSlot = Arc<Mutex<Session>>;

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<i64, SessionSlot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `user_id`, created idle on first use
    pub async fn slot(&self, user_id: i64) -> SessionSlot {
        {
            let sessions = self.sessions.read().await;
            if let Some(slot) = sessions.get(&user_id) {
                return Arc::clone(slot);
            }
        }

        let mut sessions = self.sessions.write().await;
        let slot = sessions.entry(user_id).or_insert_with(|| {
            tracing::debug!(user_id, "Creating session");
            Arc::new(Mutex::new(Session::default()))
        });
        Arc::clone(slot)
    }

    /// Copy of the current session, without creating one
    #[allow(dead_code)] // API completeness
    pub async fn snapshot(&self, user_id: i64) -> Option<Session> {
        let slot = self.sessions.read().await.get(&user_id).cloned()?;
        let session = slot.lock().await;
        Some(session.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[allow(dead_code)] // API completeness
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::ConvState;

    #[tokio::test]
    async fn slots_are_shared_per_user() {
        let store = SessionStore::new();
        assert!(store.snapshot(7).await.is_none());

        let a = store.slot(7).await;
        let b = store.slot(7).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len().await, 1);

        a.lock().await.history.push(ConvState::Idle);
        assert_eq!(store.snapshot(7).await.unwrap().history.len(), 1);

        store.slot(8).await;
        assert_eq!(store.len().await, 2);
    }
}
