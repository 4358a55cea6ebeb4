/// Shared error type used across all pairbot crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid identity key: {0}")]
    InvalidKey(String),

    /// The underlying client could not be built.  The session is never
    /// registered when this is returned from `start`.
    #[error("client construction failed: {0}")]
    Construction(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("session not connected: {0}")]
    NotConnected(String),

    #[error("bridge: {0}")]
    Bridge(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
