use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account role as issued by the auth subsystem.
///
/// Older records spell the job-seeker role "Seeker"; it is accepted as an
/// alias of `Student` and never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(alias = "student", alias = "Seeker", alias = "seeker")]
    Student,
    #[serde(alias = "employer")]
    Employer,
    #[serde(alias = "admin")]
    Admin,
}

impl Role {
    /// Parse role from database string (case-insensitive)
    pub fn from_db(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" | "seeker" | "jobseeker" => Some(Self::Student),
            "employer" => Some(Self::Employer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Employer => "Employer",
            Self::Admin => "Admin",
        }
    }

    /// Roles allowed to open a conversation without an application behind it.
    pub fn may_cold_message(&self) -> bool {
        match self {
            Self::Employer | Self::Admin => true,
            Self::Student => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
}

/// Longest inbox preview of a conversation's last message.
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Truncate message content to an inbox preview. Counts characters, not
/// bytes.
pub fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_MAX_CHARS).collect()
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Inbox entry: a conversation seen from one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub participants: Vec<Uuid>,
    pub initiated_by: Uuid,
    pub application_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub last_message: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub other_user: Option<UserProfile>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_messages: i64,
    pub has_more: bool,
}

impl Pagination {
    /// Build pagination metadata for a 1-based page.
    pub fn new(current_page: i64, page_size: i64, total_messages: i64) -> Self {
        let total_pages = if page_size <= 0 {
            0
        } else {
            (total_messages + page_size - 1) / page_size
        };
        Self {
            current_page,
            total_pages,
            total_messages,
            has_more: current_page < total_pages,
        }
    }
}

/// One page of a conversation, oldest message first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<ChatMessage>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub marked_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_legacy_spellings() {
        assert_eq!(Role::from_db("Employer"), Some(Role::Employer));
        assert_eq!(Role::from_db("seeker"), Some(Role::Student));
        assert_eq!(Role::from_db(" ADMIN "), Some(Role::Admin));
        assert_eq!(Role::from_db("recruiter"), None);

        let role: Role = serde_json::from_str("\"Seeker\"").unwrap();
        assert_eq!(role, Role::Student);
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"Student\"");
    }

    #[test]
    fn only_employers_and_admins_cold_message() {
        assert!(Role::Employer.may_cold_message());
        assert!(Role::Admin.may_cold_message());
        assert!(!Role::Student.may_cold_message());
    }

    #[test]
    fn pagination_math() {
        let p = Pagination::new(1, 50, 120);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_more);

        let last = Pagination::new(3, 50, 120);
        assert!(!last.has_more);

        let empty = Pagination::new(1, 50, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_more);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        assert_eq!(preview(&long).chars().count(), PREVIEW_MAX_CHARS);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn message_uses_camel_case_keys() {
        let msg = ChatMessage {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            content: "hello".into(),
            is_read: false,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("conversationId").is_some());
        assert!(value.get("senderId").is_some());
        assert_eq!(value["isRead"], false);
    }
}
