use crate::reconcile::{self, PendingMessage, ThreadMessage};
use chat_protocol::{preview, ChatMessage, ConversationView, ErrorPayload, ServerEvent};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Local view of one user's chat.
#[derive(Debug, Clone)]
pub struct ChatState {
    user_id: Uuid,
    active: Option<Uuid>,
    conversations: Vec<ConversationView>,
    threads: HashMap<Uuid, Vec<ThreadMessage>>,
    unread: HashMap<Uuid, i64>,
    typing: HashMap<Uuid, HashSet<Uuid>>,
}

impl ChatState {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            active: None,
            conversations: Vec::new(),
            threads: HashMap::new(),
            unread: HashMap::new(),
            typing: HashMap::new(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn active(&self) -> Option<Uuid> {
        self.active
    }

    /// The conversation currently on screen. Messages arriving for it do not
    /// count as unread.
    pub fn set_active(&mut self, conversation_id: Option<Uuid>) {
        self.active = conversation_id;
    }

    pub fn conversations(&self) -> &[ConversationView] {
        &self.conversations
    }

    /// Replace the inbox with a server listing. Server unread counts win.
    pub fn set_conversations(&mut self, conversations: Vec<ConversationView>) {
        self.unread = conversations
            .iter()
            .map(|c| (c.id, c.unread_count))
            .collect();
        self.conversations = conversations;
    }

    pub fn thread(&self, conversation_id: Uuid) -> &[ThreadMessage] {
        self.threads
            .get(&conversation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn unread_count(&self, conversation_id: Uuid) -> i64 {
        self.unread.get(&conversation_id).copied().unwrap_or(0)
    }

    pub fn total_unread(&self) -> i64 {
        self.unread.values().sum()
    }

    pub fn clear_unread(&mut self, conversation_id: Uuid) {
        self.unread.insert(conversation_id, 0);
        if let Some(c) = self.conversations.iter_mut().find(|c| c.id == conversation_id) {
            c.unread_count = 0;
        }
    }

    pub fn is_typing(&self, conversation_id: Uuid, user_id: Uuid) -> bool {
        self.typing
            .get(&conversation_id)
            .map(|users| users.contains(&user_id))
            .unwrap_or(false)
    }

    /// Append a provisional message and return its local id.
    pub fn add_pending(&mut self, conversation_id: Uuid, content: &str) -> Uuid {
        let pending = PendingMessage::new(conversation_id, self.user_id, content);
        let local_id = pending.local_id;
        self.threads
            .entry(conversation_id)
            .or_default()
            .push(ThreadMessage::Pending(pending));
        local_id
    }

    pub fn rollback_pending(&mut self, conversation_id: Uuid) {
        if let Some(thread) = self.threads.get_mut(&conversation_id) {
            *thread = reconcile::rollback(thread);
        }
    }

    pub fn load_history(&mut self, conversation_id: Uuid, history: &[ChatMessage]) {
        let merged = reconcile::merge_history(self.thread(conversation_id), history);
        self.threads.insert(conversation_id, merged);
    }

    /// Fold one authoritative message in. Returns false for a duplicate.
    pub fn receive(&mut self, message: &ChatMessage) -> bool {
        let conversation_id = message.conversation_id;
        let known = self
            .thread(conversation_id)
            .iter()
            .any(|m| m.confirmed().map(|c| c.id) == Some(message.id));

        let merged = reconcile::merge(self.thread(conversation_id), std::slice::from_ref(message));
        self.threads.insert(conversation_id, merged);
        if known {
            return false;
        }

        if message.sender_id != self.user_id && self.active != Some(conversation_id) {
            *self.unread.entry(conversation_id).or_insert(0) += 1;
            if let Some(c) = self.conversations.iter_mut().find(|c| c.id == conversation_id) {
                c.unread_count += 1;
            }
        }
        if let Some(users) = self.typing.get_mut(&conversation_id) {
            users.remove(&message.sender_id);
        }
        self.bump_conversation(message);
        true
    }

    fn bump_conversation(&mut self, message: &ChatMessage) {
        let Some(pos) = self
            .conversations
            .iter()
            .position(|c| c.id == message.conversation_id)
        else {
            return;
        };
        let mut conversation = self.conversations.remove(pos);
        conversation.last_message = Some(preview(&message.content));
        conversation.last_message_at = message.created_at;
        self.conversations.insert(0, conversation);
    }

    /// Apply a server event. Error events roll back the pending entries of
    /// the conversation they name and are handed back to the caller.
    pub fn apply(&mut self, event: &ServerEvent) -> Option<ErrorPayload> {
        match event {
            ServerEvent::NewMessage(e)
            | ServerEvent::NewMessageNotification(e)
            | ServerEvent::MessageSent(e) => {
                self.receive(&e.message);
                None
            }
            ServerEvent::UserTyping(s) => {
                self.typing
                    .entry(s.conversation_id)
                    .or_default()
                    .insert(s.user_id);
                None
            }
            ServerEvent::UserStoppedTyping(s) => {
                if let Some(users) = self.typing.get_mut(&s.conversation_id) {
                    users.remove(&s.user_id);
                }
                None
            }
            ServerEvent::Error(payload) => {
                if let Some(conversation_id) = payload.conversation_id {
                    self.rollback_pending(conversation_id);
                }
                Some(payload.clone())
            }
        }
    }
}
