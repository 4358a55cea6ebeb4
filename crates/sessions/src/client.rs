//! The messaging-client seam.
//!
//! The actual client (a headless browser driving the messaging network) is
//! an external collaborator.  Sessions only see it through
//! [`MessagingClient`] plus a stream of [`ClientEvent`]s, both produced by a
//! [`ClientFactory`].

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use pb_domain::config::LaunchConfig;
use pb_domain::error::Result;

/// Account details, available once the client is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub phone: String,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

/// A chat message received by a session.  Transient: it lives only for the
/// duration of its handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Network message ID, used to quote the message in replies.
    pub id: String,
    /// Chat the message came from.
    pub from: String,
    pub body: String,
    pub timestamp: i64,
}

/// Lifecycle and message events, in the order the client emitted them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A (new) pairing code to be scanned from the phone.
    PairingCode(String),
    Authenticated,
    Ready(ClientInfo),
    AuthFailure(String),
    Disconnected(String),
    Message(InboundMessage),
}

/// Per-key construction parameters.
#[derive(Debug, Clone)]
pub struct AuthProfile {
    /// Deterministic ID; the client keys stored credentials by it.
    pub client_id: String,
    pub data_path: Option<PathBuf>,
    pub launch: LaunchConfig,
}

pub type EventStream = mpsc::Receiver<ClientEvent>;

/// One underlying messaging connection.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Begin the handshake.  Returns once the client has started; progress
    /// is reported through the event stream.
    async fn initialize(&self) -> Result<()>;

    /// Reply to `message`, resolving once the network confirmed the send.
    async fn reply(&self, message: &InboundMessage, text: &str) -> Result<()>;

    /// Tear the connection down.  Must be safe to call more than once.
    async fn destroy(&self) -> Result<()>;
}

/// Builds clients.  Failure here means the session never gets registered.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(&self, profile: AuthProfile)
        -> Result<(Arc<dyn MessagingClient>, EventStream)>;
}
