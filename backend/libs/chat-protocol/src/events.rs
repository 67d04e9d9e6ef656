//! Socket event frames
//!
//! Every frame is a JSON text message with the event name and its payload:
//! ```json
//! { "event": "send_message", "data": { "conversationId": "...", "recipientId": "...", "content": "hi" } }
//! ```
//!
//! `join_conversation` carries the bare conversation id as its data.

use crate::dto::ChatMessage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinConversation(Uuid),
    SendMessage(SendMessagePayload),
    Typing(TypingPayload),
    StopTyping(TypingPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub conversation_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub conversation_id: Uuid,
    pub recipient_id: Uuid,
}

impl ClientEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::JoinConversation(_) => "join_conversation",
            Self::SendMessage(_) => "send_message",
            Self::Typing(_) => "typing",
            Self::StopTyping(_) => "stop_typing",
        }
    }

    pub fn from_frame(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Events pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Broadcast to the conversation room
    NewMessage(MessageEvent),
    /// Sent to the recipient's private room
    NewMessageNotification(MessageEvent),
    /// Acknowledgment to the sending connection only
    MessageSent(MessageEvent),
    UserTyping(TypingSignal),
    UserStoppedTyping(TypingSignal),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub message: ChatMessage,
    pub conversation_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    pub user_id: Uuid,
    pub conversation_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    /// Set when the failure concerns a specific conversation, so clients can
    /// roll back their optimistic state for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
}

impl ServerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NewMessage(_) => "new_message",
            Self::NewMessageNotification(_) => "new_message_notification",
            Self::MessageSent(_) => "message_sent",
            Self::UserTyping(_) => "user_typing",
            Self::UserStoppedTyping(_) => "user_stopped_typing",
            Self::Error(_) => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
            conversation_id: None,
        })
    }

    pub fn conversation_error(message: impl Into<String>, conversation_id: Uuid) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
            conversation_id: Some(conversation_id),
        })
    }

    /// The conversation this event concerns, if any.
    pub fn conversation_id(&self) -> Option<Uuid> {
        match self {
            Self::NewMessage(e) | Self::NewMessageNotification(e) | Self::MessageSent(e) => {
                Some(e.conversation_id)
            }
            Self::UserTyping(s) | Self::UserStoppedTyping(s) => Some(s.conversation_id),
            Self::Error(e) => e.conversation_id,
        }
    }

    pub fn from_frame(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
