pub mod config;

use clap::{Parser, Subcommand};

use pb_domain::config::Config;

/// pairbot — per-phone-number chat-bot sessions behind an HTTP API.
#[derive(Debug, Parser)]
#[command(name = "pairbot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Render a pairing code as a terminal QR block.
    Qr {
        /// The raw pairing code.
        code: String,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `PB_CONFIG` (or
/// `config.toml` by default).  A missing file yields the defaults.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("PB_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(config_path: &str) -> anyhow::Result<Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_default() {
        let cfg = load_config_from("/nonexistent/pairbot/config.toml").unwrap();
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn bare_invocation_has_no_subcommand() {
        let cli = Cli::try_parse_from(["pairbot"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_config_show() {
        let cli = Cli::try_parse_from(["pairbot", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand::Show))
        ));
    }

    #[test]
    fn parses_qr_code_argument() {
        let cli = Cli::try_parse_from(["pairbot", "qr", "2@abc"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Qr { code }) if code == "2@abc"));
    }
}
