pub mod conversation_service;
pub mod identity;
pub mod message_service;
pub mod policy;

pub use conversation_service::ConversationService;
pub use identity::{IdentityResolver, JwtIdentityResolver};
pub use message_service::{MessageService, SentMessage};
