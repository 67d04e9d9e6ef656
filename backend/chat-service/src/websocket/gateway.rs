//! Socket event protocol, independent of the transport.
//!
//! A [`Connection`] is created per socket. It is authenticated once at
//! connect time; unauthenticated connections stay open but every mutating
//! event is answered with an `error` event. Outbound events for the socket
//! arrive on the receiver returned by [`Gateway::connect`].

use super::registry::{ConnectionId, Room, RoomRegistry};
use crate::error::AppError;
use crate::models::User;
use crate::services::policy;
use crate::services::{ConversationService, IdentityResolver, MessageService};
use chat_protocol::{
    ClientEvent, MessageEvent, SendMessagePayload, ServerEvent, TypingPayload, TypingSignal,
};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

pub const INVALID_EVENT: &str = "invalid event";

/// One socket's identity and outbound channel.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub user: Option<User>,
    outbound: UnboundedSender<ServerEvent>,
}

impl Connection {
    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Send an event to this connection only.
    pub fn emit(&self, event: ServerEvent) {
        if self.outbound.send(event).is_err() {
            tracing::debug!(connection_id = %self.id, "emit on closed connection");
        }
    }

    fn require_user(&self) -> Result<&User, AppError> {
        self.user.as_ref().ok_or(AppError::Unauthenticated)
    }
}

#[derive(Clone)]
pub struct Gateway {
    registry: RoomRegistry,
    identity: Arc<dyn IdentityResolver>,
    conversations: ConversationService,
    messages: MessageService,
}

impl Gateway {
    pub fn new(
        registry: RoomRegistry,
        identity: Arc<dyn IdentityResolver>,
        conversations: ConversationService,
        messages: MessageService,
    ) -> Self {
        Self {
            registry,
            identity,
            conversations,
            messages,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Open a connection. A missing or invalid token leaves it
    /// unauthenticated rather than refusing it.
    pub async fn connect(
        &self,
        token: Option<&str>,
    ) -> (Connection, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = unbounded_channel();
        let id = ConnectionId::new();

        let user = match token {
            Some(token) => match self.identity.resolve(token).await {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::info!(connection_id = %id, error = %e, "socket authentication failed");
                    None
                }
            },
            None => {
                tracing::info!(connection_id = %id, "socket connected without token");
                None
            }
        };

        if let Some(user) = &user {
            self.registry.join(Room::User(user.id), id, tx.clone()).await;
            tracing::info!(connection_id = %id, user_id = %user.id, "socket authenticated");
        }

        (
            Connection {
                id,
                user,
                outbound: tx,
            },
            rx,
        )
    }

    pub async fn disconnect(&self, conn: &Connection) {
        self.registry.leave_all(conn.id).await;
        tracing::info!(connection_id = %conn.id, user_id = ?conn.user_id(), "socket disconnected");
    }

    /// Decode and handle one text frame. Malformed frames get an `error`
    /// event; the connection stays open.
    pub async fn handle_frame(&self, conn: &Connection, text: &str) {
        match ClientEvent::from_frame(text) {
            Ok(event) => self.handle_event(conn, event).await,
            Err(e) => {
                tracing::debug!(connection_id = %conn.id, error = %e, "malformed frame");
                conn.emit(ServerEvent::error(INVALID_EVENT));
            }
        }
    }

    pub async fn handle_event(&self, conn: &Connection, event: ClientEvent) {
        tracing::debug!(connection_id = %conn.id, event = event.event_type(), "inbound event");
        match event {
            ClientEvent::JoinConversation(conversation_id) => {
                if let Err(e) = self.join_conversation(conn, conversation_id).await {
                    conn.emit(error_event(&e, conversation_id));
                }
            }
            ClientEvent::SendMessage(payload) => {
                let conversation_id = payload.conversation_id;
                if let Err(e) = self.send_message(conn, payload).await {
                    conn.emit(error_event(&e, conversation_id));
                }
            }
            ClientEvent::Typing(payload) => self.relay_typing(conn, payload, true).await,
            ClientEvent::StopTyping(payload) => self.relay_typing(conn, payload, false).await,
        }
    }

    async fn join_conversation(
        &self,
        conn: &Connection,
        conversation_id: Uuid,
    ) -> Result<(), AppError> {
        let user = conn.require_user()?;
        self.conversations
            .get_for_participant(conversation_id, user.id)
            .await?;
        self.registry
            .join(
                Room::Conversation(conversation_id),
                conn.id,
                conn.outbound.clone(),
            )
            .await;
        tracing::debug!(connection_id = %conn.id, %conversation_id, "joined conversation");
        Ok(())
    }

    async fn send_message(
        &self,
        conn: &Connection,
        payload: SendMessagePayload,
    ) -> Result<(), AppError> {
        let user = conn.require_user()?;
        let sent = self
            .messages
            .send_message(payload.conversation_id, user.id, &payload.content)
            .await?;

        let conversation_id = sent.conversation.id;
        let recipient_id = sent
            .conversation
            .other_participant(user.id)
            .ok_or(AppError::Internal)?;
        if payload.recipient_id != recipient_id {
            tracing::warn!(
                connection_id = %conn.id,
                %conversation_id,
                claimed = %payload.recipient_id,
                actual = %recipient_id,
                "recipientId does not match conversation, using participant"
            );
        }

        let event = MessageEvent {
            message: sent.message,
            conversation_id,
        };
        let room_deliveries = self
            .registry
            .broadcast(
                Room::Conversation(conversation_id),
                &ServerEvent::NewMessage(event.clone()),
            )
            .await;
        let notified = self
            .registry
            .broadcast(
                Room::User(recipient_id),
                &ServerEvent::NewMessageNotification(event.clone()),
            )
            .await;
        conn.emit(ServerEvent::MessageSent(event));

        tracing::debug!(
            %conversation_id,
            room_deliveries,
            notified,
            "message fanned out"
        );
        Ok(())
    }

    /// Typing signals are best effort: failures are logged, never reported.
    async fn relay_typing(&self, conn: &Connection, payload: TypingPayload, started: bool) {
        let Some(user_id) = conn.user_id() else {
            return;
        };

        let conversation = match self
            .conversations
            .get_for_participant(payload.conversation_id, user_id)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(connection_id = %conn.id, error = %e, "typing signal dropped");
                return;
            }
        };
        let Some(recipient_id) = conversation.other_participant(user_id) else {
            return;
        };

        let signal = TypingSignal {
            user_id,
            conversation_id: conversation.id,
        };
        let event = if started {
            ServerEvent::UserTyping(signal)
        } else {
            ServerEvent::UserStoppedTyping(signal)
        };
        self.registry.broadcast(Room::User(recipient_id), &event).await;
    }
}

fn error_event(err: &AppError, conversation_id: Uuid) -> ServerEvent {
    let message = match err {
        AppError::NotFound("conversation") => policy::ACCESS_DENIED.to_string(),
        other => other.client_message(),
    };
    match err {
        AppError::Unauthenticated => ServerEvent::error(message),
        _ => ServerEvent::conversation_error(message, conversation_id),
    }
}
