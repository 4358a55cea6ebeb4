//! Command parsing and dispatch.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::FutureExt;

use pb_domain::config::CommandsConfig;
use pb_domain::trace::TraceEvent;
use pb_sessions::{InboundMessage, Session, SessionHandler};

use crate::autoreply::AutoReply;
use crate::registry::CommandRegistry;

/// Sent to the chat when a command fails.
pub const COMMAND_ERROR_REPLY: &str = "An error occurred while processing your command.";

/// Extract the command name from `body`: the text after `prefix` up to the
/// first whitespace, lowercased.  A bare prefix is not a command.
pub fn parse_command(body: &str, prefix: char) -> Option<String> {
    let rest = body.strip_prefix(prefix)?;
    let name = rest.split_whitespace().next()?;
    // `split_whitespace` skips leading blanks; ". ping" is not a command.
    if !rest.starts_with(name) {
        return None;
    }
    Some(name.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    NotACommand,
    /// Prefixed, but nothing registered under the name.  No reply is sent.
    Unknown(String),
    Executed(String),
    /// The command returned an error or panicked; the error reply went out.
    Failed(String),
}

pub struct Dispatcher {
    registry: CommandRegistry,
    prefix: char,
    auto_reply: AutoReply,
}

impl Dispatcher {
    pub fn new(registry: CommandRegistry, prefix: char, auto_reply: AutoReply) -> Self {
        Self {
            registry,
            prefix,
            auto_reply,
        }
    }

    /// Built-in commands plus the configured greeting.
    pub fn from_config(config: &CommandsConfig) -> Self {
        Self::new(
            CommandRegistry::with_builtins(config.prefix),
            config.prefix,
            AutoReply::from_config(config),
        )
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Route `message` to its command.  Handler errors and panics are
    /// caught, logged and answered with [`COMMAND_ERROR_REPLY`]; they never
    /// propagate or touch the session state.
    pub async fn dispatch(&self, message: &InboundMessage, session: &Session) -> DispatchOutcome {
        let Some(name) = parse_command(&message.body, self.prefix) else {
            return DispatchOutcome::NotACommand;
        };
        let Some(command) = self.registry.get(&name) else {
            tracing::debug!(command = %name, "unknown command");
            return DispatchOutcome::Unknown(name);
        };

        let started = Instant::now();
        let result = AssertUnwindSafe(command.execute(message, session))
            .catch_unwind()
            .await;
        let error = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_panic) => Some("command handler panicked".to_owned()),
        };

        TraceEvent::CommandDispatched {
            session_key: session.key().to_string(),
            command: name.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
            ok: error.is_none(),
        }
        .emit();

        match error {
            None => DispatchOutcome::Executed(name),
            Some(error) => {
                tracing::error!(command = %name, error = %error, "command failed");
                if let Err(e) = session.reply(message, COMMAND_ERROR_REPLY).await {
                    tracing::warn!(command = %name, error = %e, "error reply failed");
                }
                DispatchOutcome::Failed(name)
            }
        }
    }

    /// Full handling of one inbound message: command dispatch, then the
    /// greeting check, which runs regardless of the dispatch outcome.
    pub async fn handle(&self, message: &InboundMessage, session: &Session) -> DispatchOutcome {
        let outcome = self.dispatch(message, session).await;
        self.auto_reply.respond(message, session).await;
        outcome
    }
}

#[async_trait]
impl SessionHandler for Dispatcher {
    async fn on_message(&self, message: &InboundMessage, session: &Session) {
        self.handle(message, session).await;
    }
}
