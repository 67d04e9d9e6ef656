pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::{canonical_pair, Conversation, ConversationSummary, NewConversation};
pub use message::{preview, Message, PREVIEW_MAX_CHARS};
pub use user::{Application, ApplicationStatus, User};
