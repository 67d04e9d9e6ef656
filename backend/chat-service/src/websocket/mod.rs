pub mod gateway;
pub mod registry;
pub mod session;

pub use gateway::{Connection, Gateway};
pub use registry::{ConnectionId, Room, RoomRegistry};
pub use session::WsSession;
