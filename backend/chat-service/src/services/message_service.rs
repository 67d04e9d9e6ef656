use crate::error::{AppError, AppResult};
use crate::models::{preview, Conversation};
use crate::services::policy;
use crate::store::ChatStore;
use chat_protocol::{ChatMessage, MessagePage, Pagination};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const MAX_CONTENT_CHARS: usize = 5000;

/// Result of a successful send: the stored message and the conversation it
/// landed in, used to address the recipient.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: ChatMessage,
    pub conversation: Conversation,
}

#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn ChatStore>,
    default_page_size: i64,
    max_page_size: i64,
    // serializes the first send of each conversation
    first_send_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl MessageService {
    pub fn new(store: Arc<dyn ChatStore>, default_page_size: i64, max_page_size: i64) -> Self {
        Self {
            store,
            default_page_size,
            max_page_size,
            first_send_locks: Arc::new(DashMap::new()),
        }
    }

    async fn load_for_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Conversation> {
        let conversation = self
            .store
            .find_conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;
        policy::require_participant(&conversation, user_id)?;
        Ok(conversation)
    }

    /// One page of history in chronological order. Page 1 holds the newest
    /// messages.
    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        requester_id: Uuid,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> AppResult<MessagePage> {
        self.load_for_participant(conversation_id, requester_id)
            .await?;

        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        let offset = (page - 1).saturating_mul(limit);

        let total = self.store.count_messages(conversation_id).await?;
        let mut rows = self
            .store
            .list_messages(conversation_id, limit, offset)
            .await?;
        rows.reverse();

        Ok(MessagePage {
            messages: rows.into_iter().map(ChatMessage::from).collect(),
            pagination: Pagination::new(page, limit, total),
        })
    }

    /// Validate and persist a message. The conversation's preview is
    /// refreshed with it.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> AppResult<SentMessage> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::invalid_input("message content cannot be empty"));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(AppError::invalid_input(format!(
                "message content exceeds {MAX_CONTENT_CHARS} characters"
            )));
        }

        let conversation = self.load_for_participant(conversation_id, sender_id).await?;

        let existing = self.store.count_messages(conversation_id).await?;
        let message = if existing > 0 {
            self.store
                .insert_message(conversation_id, sender_id, content, &preview(content))
                .await?
        } else {
            self.first_send(&conversation, sender_id, content).await?
        };

        tracing::debug!(
            conversation_id = %conversation_id,
            message_id = %message.id,
            sender_id = %sender_id,
            "message stored"
        );

        Ok(SentMessage {
            message: message.into(),
            conversation,
        })
    }

    async fn first_send(
        &self,
        conversation: &Conversation,
        sender_id: Uuid,
        content: &str,
    ) -> AppResult<crate::models::Message> {
        let lock = self
            .first_send_locks
            .entry(conversation.id)
            .or_default()
            .clone();

        let result = async {
            let _guard = lock.lock().await;

            // the other participant may have won while we waited
            let existing = self.store.count_messages(conversation.id).await?;
            policy::authorize_send(conversation, sender_id, existing)?;

            let message = self
                .store
                .insert_message(conversation.id, sender_id, content, &preview(content))
                .await?;
            Ok::<_, AppError>(message)
        }
        .await;

        // last holder out drops the entry, refused or not
        drop(lock);
        self.first_send_locks
            .remove_if(&conversation.id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    /// Mark everything the other participant sent as read.
    pub async fn mark_read(&self, conversation_id: Uuid, requester_id: Uuid) -> AppResult<u64> {
        self.load_for_participant(conversation_id, requester_id)
            .await?;
        let changed = self.store.mark_read(conversation_id, requester_id).await?;
        if changed > 0 {
            tracing::debug!(%conversation_id, %requester_id, changed, "messages marked read");
        }
        Ok(changed)
    }
}
