use chat_protocol::{Role, UserProfile};
use uuid::Uuid;

/// User record as owned by the auth subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            full_name: self.full_name.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    /// Parse status from database string. Unknown values are treated as
    /// pending so they never unlock a conversation.
    pub fn from_db(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

/// Job application, joined with the owner of its job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub job_id: Uuid,
    pub employer_id: Uuid,
    pub status: ApplicationStatus,
}

impl Application {
    /// The other party of the application, if `user_id` is one of them.
    pub fn counterpart(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.applicant_id {
            Some(self.employer_id)
        } else if user_id == self.employer_id {
            Some(self.applicant_id)
        } else {
            None
        }
    }
}
