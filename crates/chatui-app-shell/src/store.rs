use std::cell::RefCell;

use async_trait::async_trait;
use chatui_core::hash::HashMap;
use indexmap::IndexMap;

use crate::transport::{MessageId, SessionId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageInfo {
    pub message_id: MessageId,
    pub has_media: bool,
    /// Bumped for every edit that would otherwise change nothing visible.
    pub update_counter: u32,
}

impl MessageInfo {
    pub fn new(message_id: MessageId, has_media: bool) -> Self {
        Self {
            message_id,
            has_media,
            update_counter: 0,
        }
    }
}

/// Remote identity of every message on screen, keyed by session and message key.
#[async_trait(?Send)]
pub trait MessageInfoStore {
    async fn get(&self, session: SessionId, key: &str) -> Option<MessageInfo>;

    async fn get_all(&self, session: SessionId) -> Vec<MessageInfo>;

    async fn add(&self, session: SessionId, key: &str, info: MessageInfo);

    /// Removes the entry holding `message_id`, whatever its key.
    async fn remove(&self, session: SessionId, message_id: MessageId);

    async fn remove_all(&self, session: SessionId);
}

#[derive(Default)]
pub struct MemoryMessageInfoStore {
    sessions: RefCell<HashMap<SessionId, IndexMap<String, MessageInfo>>>,
}

impl MemoryMessageInfoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in the order their messages were stored.
    pub fn keys(&self, session: SessionId) -> Vec<String> {
        self.sessions
            .borrow()
            .get(&session)
            .map(|messages| messages.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait(?Send)]
impl MessageInfoStore for MemoryMessageInfoStore {
    async fn get(&self, session: SessionId, key: &str) -> Option<MessageInfo> {
        self.sessions.borrow().get(&session)?.get(key).copied()
    }

    async fn get_all(&self, session: SessionId) -> Vec<MessageInfo> {
        self.sessions
            .borrow()
            .get(&session)
            .map(|messages| messages.values().copied().collect())
            .unwrap_or_default()
    }

    async fn add(&self, session: SessionId, key: &str, info: MessageInfo) {
        self.sessions
            .borrow_mut()
            .entry(session)
            .or_default()
            .insert(key.to_owned(), info);
    }

    async fn remove(&self, session: SessionId, message_id: MessageId) {
        if let Some(messages) = self.sessions.borrow_mut().get_mut(&session) {
            messages.retain(|_, info| info.message_id != message_id);
        }
    }

    async fn remove_all(&self, session: SessionId) {
        self.sessions.borrow_mut().remove(&session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remove_goes_by_remote_id() {
        let store = MemoryMessageInfoStore::new();
        store.add(1, "a", MessageInfo::new(10, false)).await;
        store.add(1, "b", MessageInfo::new(11, true)).await;
        store.add(2, "a", MessageInfo::new(10, false)).await;

        store.remove(1, 10).await;

        assert_eq!(store.get(1, "a").await, None);
        assert_eq!(store.get(1, "b").await, Some(MessageInfo::new(11, true)));
        assert_eq!(store.get_all(2).await.len(), 1);

        store.remove_all(1).await;
        assert!(store.get_all(1).await.is_empty());
        assert_eq!(store.keys(2), ["a"]);
    }
}
