//! Optimistic thread entries and their reconciliation with server messages.

use chat_protocol::ChatMessage;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// A message shown before the server has acknowledged it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    /// Client-generated; never sent to the server.
    pub local_id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl PendingMessage {
    pub fn new(conversation_id: Uuid, sender_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadMessage {
    Confirmed(ChatMessage),
    Pending(PendingMessage),
}

impl ThreadMessage {
    /// Server id for confirmed entries, local id for pending ones.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Confirmed(m) => m.id,
            Self::Pending(p) => p.local_id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Confirmed(m) => &m.content,
            Self::Pending(p) => &p.content,
        }
    }

    pub fn sender_id(&self) -> Uuid {
        match self {
            Self::Confirmed(m) => m.sender_id,
            Self::Pending(p) => p.sender_id,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn confirmed(&self) -> Option<&ChatMessage> {
        match self {
            Self::Confirmed(m) => Some(m),
            Self::Pending(_) => None,
        }
    }
}

/// Fold server-pushed messages into a thread.
///
/// Any incoming message supersedes every pending entry of the thread.
/// Incoming messages already present (same server id) are skipped, so the
/// room broadcast and the private notification of one message collapse into
/// a single entry.
pub fn merge(local: &[ThreadMessage], incoming: &[ChatMessage]) -> Vec<ThreadMessage> {
    if incoming.is_empty() {
        return local.to_vec();
    }

    let mut seen: HashSet<Uuid> = local
        .iter()
        .filter_map(|m| m.confirmed().map(|c| c.id))
        .collect();

    let mut merged: Vec<ThreadMessage> = local
        .iter()
        .filter(|m| !m.is_pending())
        .cloned()
        .collect();
    for message in incoming {
        if seen.insert(message.id) {
            merged.push(ThreadMessage::Confirmed(message.clone()));
        }
    }
    merged
}

/// Fold a page of fetched history into a thread. Confirmed entries are kept
/// in chronological order; pending entries stay at the tail.
pub fn merge_history(local: &[ThreadMessage], history: &[ChatMessage]) -> Vec<ThreadMessage> {
    let mut seen = HashSet::new();
    let mut confirmed: Vec<ChatMessage> = history
        .iter()
        .chain(local.iter().filter_map(ThreadMessage::confirmed))
        .filter(|m| seen.insert(m.id))
        .cloned()
        .collect();
    confirmed.sort_by_key(|m| m.created_at);

    confirmed
        .into_iter()
        .map(ThreadMessage::Confirmed)
        .chain(local.iter().filter(|m| m.is_pending()).cloned())
        .collect()
}

/// Drop the pending entries of a thread, e.g. after the server refused them.
pub fn rollback(local: &[ThreadMessage]) -> Vec<ThreadMessage> {
    local.iter().filter(|m| !m.is_pending()).cloned().collect()
}
