//! Who may open a conversation, and who may speak first.
//!
//! Pure functions over already-loaded records so the rules can be checked
//! without a store.

use crate::error::AppError;
use crate::models::{Application, ApplicationStatus, Conversation, User};
use uuid::Uuid;

pub const NOT_ACCEPTED: &str = "only accepted applications may open a conversation";
pub const NOT_APPLICATION_PARTY: &str = "you are not a party to this application";
pub const NOT_APPLICATION_COUNTERPART: &str =
    "the other user is not the counterpart of this application";
pub const COLD_OUTREACH: &str =
    "only employers and admins may start a conversation without an application";
pub const FIRST_MESSAGE: &str = "only the recruiter can send the first message";
pub const ACCESS_DENIED: &str = "conversation not found or access denied";

/// Gate for creating a new conversation between `requester` and `target_id`.
///
/// With an application, it must be accepted and the two users must be its
/// applicant and the employer owning its job. Without one, only roles that
/// may cold-message can initiate.
pub fn authorize_creation(
    requester: &User,
    target_id: Uuid,
    application: Option<&Application>,
) -> Result<(), AppError> {
    if requester.id == target_id {
        return Err(AppError::InvalidParticipants);
    }

    match application {
        Some(app) => {
            if app.status != ApplicationStatus::Accepted {
                return Err(AppError::forbidden(NOT_ACCEPTED));
            }
            match app.counterpart(requester.id) {
                None => Err(AppError::forbidden(NOT_APPLICATION_PARTY)),
                Some(counterpart) if counterpart != target_id => {
                    Err(AppError::forbidden(NOT_APPLICATION_COUNTERPART))
                }
                Some(_) => Ok(()),
            }
        }
        None if requester.role.may_cold_message() => Ok(()),
        None => Err(AppError::forbidden(COLD_OUTREACH)),
    }
}

pub fn require_participant(conversation: &Conversation, user_id: Uuid) -> Result<(), AppError> {
    if conversation.is_participant(user_id) {
        Ok(())
    } else {
        Err(AppError::forbidden(ACCESS_DENIED))
    }
}

/// Only the initiator may break the silence of an empty conversation.
pub fn authorize_send(
    conversation: &Conversation,
    sender_id: Uuid,
    existing_messages: i64,
) -> Result<(), AppError> {
    require_participant(conversation, sender_id)?;
    if existing_messages == 0 && conversation.initiated_by != sender_id {
        return Err(AppError::forbidden(FIRST_MESSAGE));
    }
    Ok(())
}
