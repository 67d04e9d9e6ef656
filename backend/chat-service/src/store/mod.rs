//! Persistence for conversations and messages, plus read-only access to
//! the users and applications owned by the rest of the job board.

use crate::models::{Application, Conversation, ConversationSummary, Message, NewConversation, User};
use async_trait::async_trait;
use chat_protocol::Role;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The unique `(user1_id, user2_id)` key is already taken.
    #[error("conversation already exists for this pair")]
    Conflict,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn find_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>>;

    /// Lookup by canonical pair. Callers pass `(min, max)`.
    async fn find_conversation_by_pair(
        &self,
        user1_id: Uuid,
        user2_id: Uuid,
    ) -> StoreResult<Option<Conversation>>;

    /// Fails with [`StoreError::Conflict`] when the pair already has a row.
    async fn insert_conversation(&self, new: NewConversation) -> StoreResult<Conversation>;

    /// Conversations of `user_id`, most recent activity first, each with the
    /// number of unread messages sent by the other participant.
    async fn list_conversations(&self, user_id: Uuid) -> StoreResult<Vec<ConversationSummary>>;

    async fn count_messages(&self, conversation_id: Uuid) -> StoreResult<i64>;

    /// Unread messages in one conversation not sent by `reader_id`.
    async fn count_unread(&self, conversation_id: Uuid, reader_id: Uuid) -> StoreResult<i64>;

    /// Newest first.
    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>>;

    /// Persist a message and refresh the conversation's `last_message`
    /// cache in the same unit of work.
    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
        preview: &str,
    ) -> StoreResult<Message>;

    /// Flip `is_read` on messages not sent by `reader_id`. Returns rows changed.
    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>>;

    /// Name search used by clients to find chat targets.
    async fn search_users(
        &self,
        query: Option<&str>,
        role: Option<Role>,
        limit: i64,
    ) -> StoreResult<Vec<User>>;
}
