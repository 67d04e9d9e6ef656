//! Client-side view of the chat: optimistic sends reconciled against server
//! events, unread counters, typing indicators, and a websocket session that
//! drives them.

pub mod error;
pub mod reconcile;
pub mod session;
pub mod state;
pub mod typing;

pub use error::{ClientError, ClientResult};
pub use reconcile::{PendingMessage, ThreadMessage};
pub use session::ChatSession;
pub use state::ChatState;
pub use typing::{TypingDebouncer, TypingTransition};
