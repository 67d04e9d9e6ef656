//! # Chat Protocol
//!
//! Wire contract shared by the chat service and its clients.
//!
//! ## Modules
//! - `dto`: JSON bodies returned by the HTTP routes and embedded in socket events
//! - `events`: socket frames in both directions
//!
//! Event names and payload keys are part of the client contract and must not
//! be renamed.

pub mod dto;
pub mod events;

pub use dto::{
    preview, ChatMessage, ConversationView, MarkReadResponse, MessagePage, Pagination, Role,
    UserProfile, PREVIEW_MAX_CHARS,
};
pub use events::{
    ClientEvent, ErrorPayload, MessageEvent, SendMessagePayload, ServerEvent, TypingPayload,
    TypingSignal,
};
