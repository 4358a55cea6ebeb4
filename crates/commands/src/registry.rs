//! Command registry: maps command names to handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use pb_domain::error::Result;
use pb_sessions::{InboundMessage, Session};

use crate::builtin::{HelpCommand, PingCommand};

/// A named chat command.  Commands are stateless; anything they send goes
/// out through [`Session::reply`].
#[async_trait]
pub trait Command: Send + Sync + 'static {
    async fn execute(&self, message: &InboundMessage, session: &Session) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `ping` and `help`, with help text for `prefix`.
    pub fn with_builtins(prefix: char) -> Self {
        let mut reg = Self::new();
        reg.register("ping", PingCommand)
            .register("help", HelpCommand::new(prefix));
        reg
    }

    /// Register a command.  Names are lowercased, so lookups are
    /// case-insensitive.  A later registration replaces an earlier one.
    pub fn register<C: Command>(&mut self, name: impl Into<String>, command: C) -> &mut Self {
        self.commands
            .insert(name.into().to_lowercase(), Arc::new(command));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Command for Noop {
        async fn execute(&self, _message: &InboundMessage, _session: &Session) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn builtins_are_registered() {
        let reg = CommandRegistry::with_builtins('.');
        assert_eq!(reg.names(), vec!["help", "ping"]);
    }

    #[test]
    fn names_are_lowercased() {
        let mut reg = CommandRegistry::new();
        reg.register("Status", Noop);
        assert!(reg.get("status").is_some());
        assert!(reg.get("Status").is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn register_replaces_existing() {
        let mut reg = CommandRegistry::with_builtins('.');
        reg.register("PING", Noop);
        assert_eq!(reg.len(), 2);
    }
}
