use crate::error::{AppError, AppResult};
use crate::models::{canonical_pair, Conversation, NewConversation, User};
use crate::services::policy;
use crate::store::{ChatStore, Directory, StoreError};
use chat_protocol::ConversationView;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ConversationService {
    store: Arc<dyn ChatStore>,
    directory: Arc<dyn Directory>,
}

impl ConversationService {
    pub fn new(store: Arc<dyn ChatStore>, directory: Arc<dyn Directory>) -> Self {
        Self { store, directory }
    }

    /// Inbox of `user_id`, most recent activity first.
    pub async fn list_conversations(&self, user_id: Uuid) -> AppResult<Vec<ConversationView>> {
        let summaries = self.store.list_conversations(user_id).await?;

        let other_ids: Vec<Uuid> = summaries
            .iter()
            .filter_map(|s| s.conversation.other_participant(user_id))
            .collect();
        let profiles: HashMap<Uuid, User> = self
            .directory
            .find_users(&other_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(summaries
            .into_iter()
            .map(|s| {
                let other = s
                    .conversation
                    .other_participant(user_id)
                    .and_then(|id| profiles.get(&id))
                    .map(User::profile);
                s.conversation.into_view(other, s.unread_count)
            })
            .collect())
    }

    /// Return the conversation between `requester` and `other_user_id`,
    /// creating it when the pair has none yet.
    ///
    /// An existing conversation is returned as-is: policy is only applied on
    /// creation and `initiated_by` never changes.
    pub async fn get_or_create(
        &self,
        requester: &User,
        other_user_id: Uuid,
        application_id: Option<Uuid>,
        job_id: Option<Uuid>,
    ) -> AppResult<Conversation> {
        if requester.id == other_user_id {
            return Err(AppError::InvalidParticipants);
        }

        let (user1_id, user2_id) = canonical_pair(requester.id, other_user_id);
        if let Some(existing) = self.store.find_conversation_by_pair(user1_id, user2_id).await? {
            return Ok(existing);
        }

        if self.directory.find_user(other_user_id).await?.is_none() {
            return Err(AppError::NotFound("user"));
        }

        let application = match application_id {
            Some(id) => Some(
                self.directory
                    .find_application(id)
                    .await?
                    .ok_or(AppError::NotFound("application"))?,
            ),
            None => None,
        };

        policy::authorize_creation(requester, other_user_id, application.as_ref())?;

        let job_id = job_id.or(application.as_ref().map(|a| a.job_id));
        let new = NewConversation::new(requester.id, other_user_id, application_id, job_id);

        match self.store.insert_conversation(new).await {
            Ok(conversation) => {
                tracing::info!(
                    conversation_id = %conversation.id,
                    initiated_by = %conversation.initiated_by,
                    application_id = ?conversation.application_id,
                    "conversation created"
                );
                Ok(conversation)
            }
            Err(StoreError::Conflict) => {
                // lost the race against the other participant
                tracing::debug!(%user1_id, %user2_id, "concurrent create, reading winner");
                self.store
                    .find_conversation_by_pair(user1_id, user2_id)
                    .await?
                    .ok_or(AppError::Internal)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Same as [`get_or_create`](Self::get_or_create) but shaped for the
    /// requester's inbox.
    pub async fn get_or_create_view(
        &self,
        requester: &User,
        other_user_id: Uuid,
        application_id: Option<Uuid>,
        job_id: Option<Uuid>,
    ) -> AppResult<ConversationView> {
        let conversation = self
            .get_or_create(requester, other_user_id, application_id, job_id)
            .await?;
        let other = self
            .directory
            .find_user(other_user_id)
            .await?
            .map(|u| u.profile());
        let unread = self
            .store
            .count_unread(conversation.id, requester.id)
            .await?;
        Ok(conversation.into_view(other, unread))
    }

    /// Load a conversation the caller takes part in.
    pub async fn get_for_participant(
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
}
