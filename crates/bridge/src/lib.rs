//! `pb-bridge`: messaging client backed by a sidecar over WebSocket.
//!
//! The sidecar runs the headless browser that speaks to the messaging
//! network.  Each session gets its own connection:
//!
//! 1. Connect WS (`client_id=<profile id>` and optional `token=` query params)
//! 2. Send `client_hello { protocol_version, client_id, data_path, launch }`
//! 3. Wait for `sidecar_welcome`
//! 4. Main loop:
//!    - lifecycle frames (`qr`, `authenticated`, `ready`, `auth_failure`,
//!      `disconnected`) and `message` frames become [`ClientEvent`]s; the
//!      reader queues them without waiting on the session, so a backlog
//!      never delays the frames below
//!    - `reply_ack` resolves the matching pending `reply`
//!    - `ping` is answered with `pong`; we ping periodically too
//! 5. On socket close: fail pending replies, emit `disconnected`.  There is
//!    no reconnect; the caller starts a new session instead.
//!
//! [`ClientEvent`]: pb_sessions::ClientEvent

pub mod client;
pub mod error;
pub mod factory;
pub mod pending;

pub use client::BridgeClient;
pub use error::BridgeError;
pub use factory::BridgeClientFactory;
pub use pending::PendingReplies;
