use super::{ChatStore, Directory, StoreError, StoreResult};
use crate::models::{
    Application, ApplicationStatus, Conversation, ConversationSummary, Message, NewConversation,
    User,
};
use async_trait::async_trait;
use chat_protocol::Role;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    applications: HashMap<Uuid, Application>,
    conversations: HashMap<Uuid, Conversation>,
    pairs: HashMap<(Uuid, Uuid), Uuid>,
    // insertion order doubles as message sequence
    messages: Vec<Message>,
}

/// Process-local store used by tests and local runs without Postgres.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id, user);
    }

    pub async fn insert_application(&self, application: Application) {
        self.inner
            .write()
            .await
            .applications
            .insert(application.id, application);
    }

    /// Returns false when the application does not exist.
    pub async fn set_application_status(&self, id: Uuid, status: ApplicationStatus) -> bool {
        match self.inner.write().await.applications.get_mut(&id) {
            Some(app) => {
                app.status = status;
                true
            }
            None => false,
        }
    }

    pub async fn conversation_count(&self) -> usize {
        self.inner.read().await.conversations.len()
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn find_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        Ok(self.inner.read().await.conversations.get(&id).cloned())
    }

    async fn find_conversation_by_pair(
        &self,
        user1_id: Uuid,
        user2_id: Uuid,
    ) -> StoreResult<Option<Conversation>> {
        let guard = self.inner.read().await;
        Ok(guard
            .pairs
            .get(&(user1_id, user2_id))
            .and_then(|id| guard.conversations.get(id))
            .cloned())
    }

    async fn insert_conversation(&self, new: NewConversation) -> StoreResult<Conversation> {
        let mut guard = self.inner.write().await;
        let key = (new.user1_id, new.user2_id);
        if guard.pairs.contains_key(&key) {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user1_id: new.user1_id,
            user2_id: new.user2_id,
            initiated_by: new.initiated_by,
            application_id: new.application_id,
            job_id: new.job_id,
            last_message: None,
            last_message_at: now,
            created_at: now,
            updated_at: now,
        };
        guard.pairs.insert(key, conversation.id);
        guard
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn list_conversations(&self, user_id: Uuid) -> StoreResult<Vec<ConversationSummary>> {
        let guard = self.inner.read().await;
        let mut summaries: Vec<ConversationSummary> = guard
            .conversations
            .values()
            .filter(|c| c.is_participant(user_id))
            .map(|c| {
                let unread_count = guard
                    .messages
                    .iter()
                    .filter(|m| m.conversation_id == c.id && m.sender_id != user_id && !m.is_read)
                    .count() as i64;
                ConversationSummary {
                    conversation: c.clone(),
                    unread_count,
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.conversation
                .last_message_at
                .cmp(&a.conversation.last_message_at)
                .then_with(|| b.conversation.created_at.cmp(&a.conversation.created_at))
        });
        Ok(summaries)
    }

    async fn count_messages(&self, conversation_id: Uuid) -> StoreResult<i64> {
        let guard = self.inner.read().await;
        Ok(guard
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .count() as i64)
    }

    async fn count_unread(&self, conversation_id: Uuid, reader_id: Uuid) -> StoreResult<i64> {
        let guard = self.inner.read().await;
        Ok(guard
            .messages
            .iter()
            .filter(|m| {
                m.conversation_id == conversation_id && m.sender_id != reader_id && !m.is_read
            })
            .count() as i64)
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>> {
        let guard = self.inner.read().await;
        Ok(guard
            .messages
            .iter()
            .rev()
            .filter(|m| m.conversation_id == conversation_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
        preview: &str,
    ) -> StoreResult<Message> {
        let mut guard = self.inner.write().await;
        let now = Utc::now();
        let conversation = guard
            .conversations
            .get_mut(&conversation_id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        conversation.last_message = Some(preview.to_string());
        conversation.last_message_at = now;
        conversation.updated_at = now;

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            is_read: false,
            created_at: now,
        };
        guard.messages.push(message.clone());
        Ok(message)
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> StoreResult<u64> {
        let mut guard = self.inner.write().await;
        let mut changed = 0;
        for m in guard.messages.iter_mut().filter(|m| {
            m.conversation_id == conversation_id && m.sender_id != reader_id && !m.is_read
        }) {
            m.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl Directory for InMemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let guard = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| guard.users.get(id).cloned())
            .collect())
    }

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>> {
        Ok(self.inner.read().await.applications.get(&id).cloned())
    }

    async fn search_users(
        &self,
        query: Option<&str>,
        role: Option<Role>,
        limit: i64,
    ) -> StoreResult<Vec<User>> {
        let needle = query.map(|q| q.trim().to_lowercase());
        let guard = self.inner.read().await;
        let mut users: Vec<User> = guard
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .filter(|u| {
                needle
                    .as_deref()
                    .map_or(true, |n| u.full_name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::canonical_pair;

    #[tokio::test]
    async fn duplicate_pair_conflicts() {
        let store = InMemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store
            .insert_conversation(NewConversation::new(a, b, None, None))
            .await
            .unwrap();
        let err = store
            .insert_conversation(NewConversation::new(b, a, None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        let (u1, u2) = canonical_pair(a, b);
        let found = store.find_conversation_by_pair(u1, u2).await.unwrap().unwrap();
        assert_eq!(found.initiated_by, a);
    }

    #[tokio::test]
    async fn insert_message_refreshes_preview_and_orders_newest_first() {
        let store = InMemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = store
            .insert_conversation(NewConversation::new(a, b, None, None))
            .await
            .unwrap();

        store.insert_message(c.id, a, "first", "first").await.unwrap();
        store.insert_message(c.id, b, "second", "second").await.unwrap();

        let page = store.list_messages(c.id, 10, 0).await.unwrap();
        assert_eq!(page[0].content, "second");
        assert_eq!(page[1].content, "first");

        let refreshed = store.find_conversation(c.id).await.unwrap().unwrap();
        assert_eq!(refreshed.last_message.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn mark_read_skips_own_messages() {
        let store = InMemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = store
            .insert_conversation(NewConversation::new(a, b, None, None))
            .await
            .unwrap();
        store.insert_message(c.id, a, "hi", "hi").await.unwrap();
        store.insert_message(c.id, b, "hey", "hey").await.unwrap();

        assert_eq!(store.mark_read(c.id, b).await.unwrap(), 1);
        assert_eq!(store.mark_read(c.id, b).await.unwrap(), 0);

        let summaries = store.list_conversations(a).await.unwrap();
        assert_eq!(summaries[0].unread_count, 1);
    }
}
