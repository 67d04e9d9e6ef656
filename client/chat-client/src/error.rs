use chat_protocol::ErrorPayload;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// An `error` event pushed by the gateway.
    #[error("{}", .0.message)]
    Server(ErrorPayload),

    #[error("session closed")]
    Closed,
}
