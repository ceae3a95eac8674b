use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::agent::ChatMessage;

/// In-memory conversation histories keyed by session id. Clearing a chat is
/// creating a new session.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, initial: Vec<ChatMessage>) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.write().await.insert(id.clone(), initial);
        id
    }

    pub async fn history(&self, id: &str) -> Option<Vec<ChatMessage>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn replace(&self, id: &str, messages: Vec<ChatMessage>) {
        self.sessions
            .write()
            .await
            .insert(id.to_string(), messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create(vec![ChatMessage::system("a")]).await;
        let b = store.create(vec![ChatMessage::system("b")]).await;
        assert_ne!(a, b);

        store
            .replace(&a, vec![ChatMessage::system("a"), ChatMessage::user("hi")])
            .await;
        assert_eq!(store.history(&a).await.unwrap().len(), 2);
        assert_eq!(store.history(&b).await.unwrap().len(), 1);
        assert!(store.history("missing").await.is_none());
    }
}
