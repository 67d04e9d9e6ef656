use chat_protocol::{ConversationView, UserProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Order two participant ids so the pair has a single representation.
///
/// `Uuid`'s ordering is byte-wise, which matches how Postgres compares
/// `uuid` values, so the `user1_id < user2_id` check constraint agrees.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub initiated_by: Uuid,
    pub application_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub last_message: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn participants(&self) -> [Uuid; 2] {
        [self.user1_id, self.user2_id]
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The participant that is not `user_id`. Returns `None` for outsiders.
    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user1_id == user_id {
            Some(self.user2_id)
        } else if self.user2_id == user_id {
            Some(self.user1_id)
        } else {
            None
        }
    }

    pub fn into_view(self, other_user: Option<UserProfile>, unread_count: i64) -> ConversationView {
        ConversationView {
            id: self.id,
            user1_id: self.user1_id,
            user2_id: self.user2_id,
            participants: self.participants().to_vec(),
            initiated_by: self.initiated_by,
            application_id: self.application_id,
            job_id: self.job_id,
            last_message: self.last_message,
            last_message_at: self.last_message_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            other_user,
            unread_count,
        }
    }
}

/// Insert payload. The pair is canonicalized on construction.
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub initiated_by: Uuid,
    pub application_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
}

impl NewConversation {
    pub fn new(
        initiated_by: Uuid,
        other_user_id: Uuid,
        application_id: Option<Uuid>,
        job_id: Option<Uuid>,
    ) -> Self {
        let (user1_id, user2_id) = canonical_pair(initiated_by, other_user_id);
        Self {
            user1_id,
            user2_id,
            initiated_by,
            application_id,
            job_id,
        }
    }
}

/// A conversation together with the caller's unread count.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationSummary {
    #[sqlx(flatten)]
    pub conversation: Conversation,
    pub unread_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
        let (lo, hi) = canonical_pair(a, b);
        assert!(lo < hi);
    }

    #[test]
    fn new_conversation_keeps_initiator_after_sorting() {
        let employer = Uuid::from_u128(9);
        let student = Uuid::from_u128(1);
        let new = NewConversation::new(employer, student, None, None);
        assert_eq!(new.user1_id, student);
        assert_eq!(new.user2_id, employer);
        assert_eq!(new.initiated_by, employer);
    }

    #[test]
    fn other_participant_rejects_outsiders() {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user1_id: Uuid::from_u128(1),
            user2_id: Uuid::from_u128(2),
            initiated_by: Uuid::from_u128(2),
            application_id: None,
            job_id: None,
            last_message: None,
            last_message_at: now,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(
            conversation.other_participant(Uuid::from_u128(1)),
            Some(Uuid::from_u128(2))
        );
        assert_eq!(conversation.other_participant(Uuid::from_u128(3)), None);
        assert!(!conversation.is_participant(Uuid::from_u128(3)));
    }
}
