mod bridge;
mod commands;
mod observability;
mod server;
mod sessions;

pub use bridge::*;
pub use commands::*;
pub use observability::*;
pub use server::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }

        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        if self.server.cors.allows_any() {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        for rule in self.server.cors.rules() {
            if !rule.has_scheme() {
                errors.push(ConfigError::warning(
                    "server.cors.allowed_origins",
                    format!("{rule:?} has no scheme and matches no browser origin"),
                ));
            }
        }

        if self.sessions.pairing_wait_ms == 0 {
            errors.push(ConfigError::error(
                "sessions.pairing_wait_ms",
                "pairing wait must be greater than 0",
            ));
        } else if self.sessions.pairing_wait_ms > MAX_PAIRING_WAIT_MS {
            errors.push(ConfigError::error(
                "sessions.pairing_wait_ms",
                format!("pairing wait must not exceed {MAX_PAIRING_WAIT_MS}ms"),
            ));
        }

        if self.sessions.event_buffer == 0 {
            errors.push(ConfigError::error(
                "sessions.event_buffer",
                "event buffer must hold at least one event",
            ));
        }

        if self.sessions.auth_profile_prefix.trim().is_empty() {
            errors.push(ConfigError::error(
                "sessions.auth_profile_prefix",
                "auth profile prefix must not be empty",
            ));
        }

        if !(self.bridge.url.starts_with("ws://") || self.bridge.url.starts_with("wss://")) {
            errors.push(ConfigError::error(
                "bridge.url",
                "bridge url must start with ws:// or wss://",
            ));
        }

        if self.bridge.reply_timeout_secs == 0 {
            errors.push(ConfigError::error(
                "bridge.reply_timeout_secs",
                "reply timeout must be greater than 0",
            ));
        }

        let rate = self.observability.sample_rate;
        if !(0.0..=1.0).contains(&rate) {
            errors.push(ConfigError::warning(
                "observability.sample_rate",
                format!("{rate} is outside 0.0..=1.0, using {}", self.observability.sampling_ratio()),
            ));
        }

        let prefix = self.commands.prefix;
        if prefix.is_whitespace() || prefix.is_alphanumeric() {
            errors.push(ConfigError::error(
                "commands.prefix",
                format!("{prefix:?} cannot be used as a command prefix"),
            ));
        }

        if !self.commands.greeting_keywords.is_empty()
            && self.commands.greeting_reply.trim().is_empty()
        {
            errors.push(ConfigError::error(
                "commands.greeting_reply",
                "greeting reply must not be empty when greeting keywords are set",
            ));
        }

        if self
            .commands
            .greeting_keywords
            .iter()
            .any(|k| k.trim().is_empty())
        {
            errors.push(ConfigError::warning(
                "commands.greeting_keywords",
                "empty keyword matches every message",
            ));
        }

        errors
    }
}
