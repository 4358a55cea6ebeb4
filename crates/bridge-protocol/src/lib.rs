//! Bridge protocol: WebSocket frames exchanged between the gateway and the
//! messaging sidecar.
//!
//! The gateway opens one connection per session.  The sidecar owns the
//! headless messaging client for that session and reports its lifecycle
//! (pairing code, authentication, readiness, failures) plus inbound chat
//! messages.  The gateway answers messages with `reply` frames.

use serde::{Deserialize, Serialize};

/// Bumped whenever a frame changes shape incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

/// WebSocket frame envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    // ── Gateway → sidecar ───────────────────────────────────────────
    /// First frame after connecting.
    ClientHello {
        protocol_version: u32,
        client_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_path: Option<String>,
        launch: LaunchOptions,
    },

    /// Start the messaging client; pairing codes follow as `qr` frames.
    Initialize,

    /// Send a reply quoting an inbound message.
    Reply {
        request_id: String,
        chat_id: String,
        message_id: String,
        text: String,
    },

    /// Tear the client down.  The sidecar closes the socket afterwards.
    Destroy,

    // ── Sidecar → gateway ───────────────────────────────────────────
    SidecarWelcome { sidecar_version: String },

    /// A fresh pairing code.  Each one supersedes the previous.
    Qr { code: String },

    Authenticated,

    Ready { info: WireClientInfo },

    AuthFailure { reason: String },

    Disconnected { reason: String },

    Message { message: WireMessage },

    ReplyAck {
        request_id: String,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    // ── Bidirectional ───────────────────────────────────────────────
    Ping { timestamp: i64 },
    Pong { timestamp: i64 },
}

/// Account details reported once the client is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireClientInfo {
    /// The paired account's phone number (`wid.user`).
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// An inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub id: String,
    /// Chat the message came from; replies go back here.
    pub from: String,
    pub body: String,
    /// Unix seconds, as reported by the messaging network.
    #[serde(default)]
    pub timestamp: i64,
}

/// Browser launch options forwarded to the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchOptions {
    pub headless: bool,
    #[serde(default)]
    pub args: Vec<String>,
}

impl BridgeMessage {
    /// Frame name as it appears in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClientHello { .. } => "client_hello",
            Self::Initialize => "initialize",
            Self::Reply { .. } => "reply",
            Self::Destroy => "destroy",
            Self::SidecarWelcome { .. } => "sidecar_welcome",
            Self::Qr { .. } => "qr",
            Self::Authenticated => "authenticated",
            Self::Ready { .. } => "ready",
            Self::AuthFailure { .. } => "auth_failure",
            Self::Disconnected { .. } => "disconnected",
            Self::Message { .. } => "message",
            Self::ReplyAck { .. } => "reply_ack",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
        }
    }
}
