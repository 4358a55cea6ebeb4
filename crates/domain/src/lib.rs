//! Shared types for the pairbot crates: the error enum, the configuration
//! schema and structured trace events.

pub mod config;
pub mod error;
pub mod trace;
