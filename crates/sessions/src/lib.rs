//! Per-phone-number bot sessions.
//!
//! A [`Session`] wraps one messaging-client connection and its lifecycle
//! state.  The [`SessionRegistry`] holds at most one live session per
//! [`IdentityKey`]; the [`LifecycleController`] creates sessions, waits
//! (briefly) for a pairing code, and feeds client events through a single
//! per-session state machine.

pub mod client;
pub mod key;
pub mod lifecycle;
pub mod registry;
pub mod session;
pub mod state;

pub use client::{
    AuthProfile, ClientEvent, ClientFactory, ClientInfo, EventStream, InboundMessage,
    MessagingClient,
};
pub use key::IdentityKey;
pub use lifecycle::{LifecycleController, SessionHandler, StartOutcome};
pub use registry::{SessionRegistry, SessionSnapshot};
pub use session::{Session, SessionStatus};
pub use state::{InvalidTransition, LifecycleState};
