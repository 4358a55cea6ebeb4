//! Chat commands for ready sessions.
//!
//! Messages starting with the configured prefix (`.` by default) are routed
//! to a named [`Command`]; every message is additionally checked for greeting
//! keywords by the [`AutoReply`].

pub mod autoreply;
pub mod builtin;
pub mod dispatch;
pub mod registry;

#[cfg(test)]
mod testing;

pub use autoreply::AutoReply;
pub use dispatch::{parse_command, DispatchOutcome, Dispatcher, COMMAND_ERROR_REPLY};
pub use registry::{Command, CommandRegistry};
