//! Keyed session registry with per-conversation mutual exclusion
//!
//! Each conversation gets its own slot behind a `tokio::sync::Mutex`. The map
//! lock is only held long enough to find or create a slot, so events for
//! different conversations never wait on each other.

use super::{ConversationId, Session};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

type Slot = Arc<Mutex<Option<Session>>>;

/// Exclusive access to one conversation's session. `None` means idle.
pub type SessionGuard = OwnedMutexGuard<Option<Session>>;

#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<ConversationId, Slot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock a conversation's slot, creating it if absent. Holders of the
    /// guard for one id are serialized; other ids are unaffected.
    pub async fn lock(&self, id: &ConversationId) -> SessionGuard {
        let existing = self.slots.read().await.get(id).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let mut slots = self.slots.write().await;
                Arc::clone(slots.entry(id.clone()).or_default())
            }
        };
        slot.lock_owned().await
    }

    /// Snapshot of a session, waiting for any in-flight event to finish
    pub async fn fetch(&self, id: &ConversationId) -> Option<Session> {
        let slot = self.slots.read().await.get(id).cloned()?;
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Discard a session outright
    pub async fn clear(&self, id: &ConversationId) -> Option<Session> {
        let removed = {
            let mut guard = self.lock(id).await;
            guard.take()
        };
        self.release(id).await;
        removed
    }

    /// Drop an idle slot from the map. Must be called after the guard for
    /// `id` has been dropped; slots that are in use or hold a session stay.
    pub async fn release(&self, id: &ConversationId) {
        let mut slots = self.slots.write().await;
        let idle = slots.get(id).is_some_and(|slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|s| s.is_none())
        });
        if idle {
            slots.remove(id);
            tracing::debug!(conversation_id = %id, "Released idle session slot");
        }
    }

    /// Number of conversations with a live session. Slots busy with an
    /// event count as live.
    pub async fn active(&self) -> usize {
        let slots = self.slots.read().await;
        slots
            .values()
            .filter(|slot| slot.try_lock().map_or(true, |s| s.is_some()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Requester;
    use std::time::Duration;
    use tokio::time::timeout;

    fn id(s: &str) -> ConversationId {
        ConversationId::new(s)
    }

    #[tokio::test]
    async fn test_lock_creates_and_fetch_reads_back() {
        let store = SessionStore::new();
        assert!(store.fetch(&id("a")).await.is_none());

        {
            let mut guard = store.lock(&id("a")).await;
            assert!(guard.is_none());
            *guard = Some(Session::new(Requester::new("7")));
        }

        let session = store.fetch(&id("a")).await.unwrap();
        assert_eq!(session.aggregate.header.requester.id, "7");
        assert_eq!(store.active().await, 1);
    }

    #[tokio::test]
    async fn test_clear_removes_session_and_slot() {
        let store = SessionStore::new();
        *store.lock(&id("a")).await = Some(Session::new(Requester::new("7")));

        assert!(store.clear(&id("a")).await.is_some());
        assert!(store.fetch(&id("a")).await.is_none());
        assert_eq!(store.active().await, 0);
        assert!(store.slots.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_release_keeps_live_sessions() {
        let store = SessionStore::new();
        *store.lock(&id("a")).await = Some(Session::new(Requester::new("7")));
        store.release(&id("a")).await;
        assert!(store.fetch(&id("a")).await.is_some());

        // Empty slot left by a lock with no session is dropped
        drop(store.lock(&id("b")).await);
        store.release(&id("b")).await;
        assert_eq!(store.slots.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_same_id_is_serialized() {
        let store = Arc::new(SessionStore::new());
        let held = store.lock(&id("a")).await;

        let contender = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let mut guard = store.lock(&id("a")).await;
                *guard = Some(Session::new(Requester::new("second")));
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        contender.await.unwrap();
        let session = store.fetch(&id("a")).await.unwrap();
        assert_eq!(session.aggregate.header.requester.id, "second");
    }

    #[tokio::test]
    async fn test_distinct_ids_do_not_block() {
        let store = SessionStore::new();
        let _held = store.lock(&id("a")).await;
        let other = timeout(Duration::from_millis(100), store.lock(&id("b"))).await;
        assert!(other.is_ok());
    }
}
