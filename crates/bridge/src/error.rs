use pb_domain::error::Error;

/// Errors raised by the bridge connection.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("websocket: {0}")]
    WebSocket(String),
    #[error("handshake: {0}")]
    Handshake(String),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("bridge connection closed")]
    Closed,
    #[error("sidecar rejected reply: {0}")]
    Rejected(String),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for BridgeError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(e.to_string())
    }
}

impl From<BridgeError> for Error {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::Timeout(what) => Error::Timeout(what.to_owned()),
            BridgeError::Handshake(m) => Error::Handshake(m),
            BridgeError::Rejected(m) => Error::Send(m),
            BridgeError::Closed => Error::NotConnected("bridge connection closed".into()),
            BridgeError::Encode(e) => Error::Json(e),
            other => Error::Bridge(other.to_string()),
        }
    }
}
