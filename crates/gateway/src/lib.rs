//! pairbot gateway: HTTP control plane for per-phone-number chat-bot
//! sessions.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod qr;
pub mod state;
