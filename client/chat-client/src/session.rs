//! Websocket + HTTP session for one signed-in user.

use crate::error::{ClientError, ClientResult};
use crate::state::ChatState;
use crate::typing::{TypingDebouncer, TypingTransition};
use chat_protocol::{
    ClientEvent, ConversationView, MarkReadResponse, MessagePage, Pagination, SendMessagePayload,
    ServerEvent, TypingPayload,
};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::connect_async;
use uuid::Uuid;

struct TypingTarget {
    recipient_id: Uuid,
    debouncer: TypingDebouncer,
}

/// Owns the socket, the HTTP client and the local [`ChatState`].
///
/// Construct one per signed-in user and pass it to whatever renders the
/// chat.
pub struct ChatSession {
    http: reqwest::Client,
    base_url: String,
    token: String,
    outbound: UnboundedSender<Message>,
    inbound: UnboundedReceiver<ClientResult<ServerEvent>>,
    state: ChatState,
    typing: HashMap<Uuid, TypingTarget>,
}

fn socket_url(base_url: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    };
    format!("{}/socket", ws_base.trim_end_matches('/'))
}

/// Handshake request with the token in the `Authorization` header. The
/// query string ends up in access logs.
fn socket_request(base_url: &str, token: &str) -> ClientResult<Request> {
    let mut request = socket_url(base_url).into_client_request()?;
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| tungstenite::Error::HttpFormat(e.into()))?;
    request.headers_mut().insert(header::AUTHORIZATION, bearer);
    Ok(request)
}

impl ChatSession {
    /// Open the socket at `{base_url}/socket`, authenticating with `token`.
    pub async fn connect(base_url: &str, token: &str, user_id: Uuid) -> ClientResult<Self> {
        let (socket, _) = connect_async(socket_request(base_url, token)?).await?;
        let (mut sink, mut stream) = socket.split();

        let (out_tx, mut out_rx) = unbounded_channel::<Message>();
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    tracing::debug!(error = %e, "socket write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let (in_tx, in_rx) = unbounded_channel();
        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let item = match frame {
                    Ok(Message::Text(text)) => {
                        ServerEvent::from_frame(text.as_str()).map_err(ClientError::from)
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => Err(ClientError::from(e)),
                };
                let fatal = matches!(item, Err(ClientError::WebSocket(_)));
                if in_tx.send(item).is_err() || fatal {
                    break;
                }
            }
        });

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            outbound: out_tx,
            inbound: in_rx,
            state: ChatState::new(user_id),
            typing: HashMap::new(),
        })
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    fn emit(&self, event: &ClientEvent) -> ClientResult<()> {
        let frame = event.to_frame()?;
        self.outbound
            .send(Message::text(frame))
            .map_err(|_| ClientError::Closed)
    }

    /// Join a conversation room and make it the active one.
    pub fn join_conversation(&mut self, conversation_id: Uuid) -> ClientResult<()> {
        self.emit(&ClientEvent::JoinConversation(conversation_id))?;
        self.state.set_active(Some(conversation_id));
        Ok(())
    }

    /// Send a message, showing it immediately as pending. Returns the
    /// pending entry's local id.
    pub fn send_message(
        &mut self,
        conversation_id: Uuid,
        recipient_id: Uuid,
        content: &str,
    ) -> ClientResult<Uuid> {
        self.stop_typing(conversation_id)?;
        let local_id = self.state.add_pending(conversation_id, content);
        let sent = self.emit(&ClientEvent::SendMessage(SendMessagePayload {
            conversation_id,
            recipient_id,
            content: content.to_string(),
        }));
        if let Err(e) = sent {
            self.state.rollback_pending(conversation_id);
            return Err(e);
        }
        Ok(local_id)
    }

    /// Record a keystroke in a conversation's composer.
    pub fn typing_input(&mut self, conversation_id: Uuid, recipient_id: Uuid) -> ClientResult<()> {
        self.typing_input_at(conversation_id, recipient_id, Instant::now())
    }

    fn typing_input_at(
        &mut self,
        conversation_id: Uuid,
        recipient_id: Uuid,
        now: Instant,
    ) -> ClientResult<()> {
        let target = self
            .typing
            .entry(conversation_id)
            .or_insert_with(|| TypingTarget {
                recipient_id,
                debouncer: TypingDebouncer::default(),
            });
        target.recipient_id = recipient_id;
        if target.debouncer.input(now) == Some(TypingTransition::Started) {
            self.emit(&ClientEvent::Typing(TypingPayload {
                conversation_id,
                recipient_id,
            }))?;
        }
        Ok(())
    }

    /// Emit `stop_typing` for every burst that has gone idle. Call this
    /// periodically, e.g. from the UI tick.
    pub fn flush_typing(&mut self) -> ClientResult<()> {
        let now = Instant::now();
        let idle: Vec<(Uuid, Uuid)> = self
            .typing
            .iter_mut()
            .filter_map(|(conversation_id, target)| {
                target
                    .debouncer
                    .poll(now)
                    .map(|_| (*conversation_id, target.recipient_id))
            })
            .collect();
        for (conversation_id, recipient_id) in idle {
            self.emit(&ClientEvent::StopTyping(TypingPayload {
                conversation_id,
                recipient_id,
            }))?;
        }
        Ok(())
    }

    fn stop_typing(&mut self, conversation_id: Uuid) -> ClientResult<()> {
        let Some(target) = self.typing.get_mut(&conversation_id) else {
            return Ok(());
        };
        if target.debouncer.stop().is_some() {
            let recipient_id = target.recipient_id;
            self.emit(&ClientEvent::StopTyping(TypingPayload {
                conversation_id,
                recipient_id,
            }))?;
        }
        Ok(())
    }

    /// Wait for the next server event and apply it to the local state.
    ///
    /// `error` events are applied (rolling back pending sends) and then
    /// returned as [`ClientError::Server`].
    pub async fn next_event(&mut self) -> ClientResult<ServerEvent> {
        let event = self.inbound.recv().await.ok_or(ClientError::Closed)??;
        match self.state.apply(&event) {
            Some(payload) => Err(ClientError::Server(payload)),
            None => Ok(event),
        }
    }

    async fn check(resp: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| status.to_string());
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn load_conversations(&mut self) -> ClientResult<&[ConversationView]> {
        let resp = self
            .http
            .get(format!("{}/conversations", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let conversations: Vec<ConversationView> = Self::check(resp).await?.json().await?;
        self.state.set_conversations(conversations);
        Ok(self.state.conversations())
    }

    /// Get or create the conversation with another user over HTTP.
    pub async fn open_conversation(
        &mut self,
        other_user_id: Uuid,
        application_id: Option<Uuid>,
    ) -> ClientResult<ConversationView> {
        let mut req = self
            .http
            .get(format!("{}/conversations/{}", self.base_url, other_user_id))
            .bearer_auth(&self.token);
        if let Some(id) = application_id {
            req = req.query(&[("applicationId", id.to_string())]);
        }
        let resp = req.send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn load_messages(
        &mut self,
        conversation_id: Uuid,
        page: i64,
    ) -> ClientResult<Pagination> {
        let resp = self
            .http
            .get(format!("{}/messages/{}", self.base_url, conversation_id))
            .query(&[("page", page)])
            .bearer_auth(&self.token)
            .send()
            .await?;
        let page: MessagePage = Self::check(resp).await?.json().await?;
        self.state.load_history(conversation_id, &page.messages);
        Ok(page.pagination)
    }

    /// Mark a conversation read on the server and zero its local counter.
    pub async fn mark_as_read(&mut self, conversation_id: Uuid) -> ClientResult<u64> {
        let resp = self
            .http
            .put(format!("{}/messages/{}/read", self.base_url, conversation_id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body: MarkReadResponse = Self::check(resp).await?.json().await?;
        self.state.clear_unread(conversation_id);
        Ok(body.marked_count)
    }

    /// Close the socket. Pending sends that were not acknowledged are lost.
    pub fn close(self) {
        let _ = self.outbound.send(Message::Close(None));
    }
}
