//! AppState construction extracted from `main.rs`.

use std::sync::Arc;

use async_trait::async_trait;

use pb_bridge::BridgeClientFactory;
use pb_commands::Dispatcher;
use pb_domain::config::{Config, ConfigSeverity};
use pb_sessions::{
    ClientFactory, InboundMessage, LifecycleController, Session, SessionHandler, SessionRegistry,
};

use crate::state::AppState;

/// Validate config and wire the sidecar-backed session stack.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }

    // ── Messaging sidecar ────────────────────────────────────────────
    let factory = Arc::new(BridgeClientFactory::new(
        config.bridge.clone(),
        &config.sessions,
    ));
    tracing::info!(url = %config.bridge.url, "sidecar bridge configured");

    Ok(build_app_state_with(config, factory))
}

/// Wire the session stack around an arbitrary client factory.
pub fn build_app_state_with(config: Arc<Config>, factory: Arc<dyn ClientFactory>) -> AppState {
    let dispatcher = Dispatcher::from_config(&config.commands);
    tracing::info!(
        prefix = %config.commands.prefix,
        commands = ?dispatcher.registry().names(),
        "commands registered"
    );

    let hooks = Arc::new(BotHooks {
        dispatcher,
        print_pairing_code: config.sessions.print_pairing_code,
    });

    let sessions = Arc::new(SessionRegistry::new());
    let lifecycle = Arc::new(LifecycleController::new(
        sessions.clone(),
        factory,
        hooks,
        config.sessions.clone(),
    ));

    AppState {
        config,
        sessions,
        lifecycle,
        started_at: std::time::Instant::now(),
    }
}

/// Per-session behavior: commands and greetings for messages, terminal QR
/// for pairing codes.
struct BotHooks {
    dispatcher: Dispatcher,
    print_pairing_code: bool,
}

#[async_trait]
impl SessionHandler for BotHooks {
    async fn on_message(&self, message: &InboundMessage, session: &Session) {
        self.dispatcher.handle(message, session).await;
    }

    fn on_pairing_code(&self, session: &Session, code: &str) {
        tracing::info!(session_key = %session.key(), "pairing code received");
        if self.print_pairing_code {
            crate::qr::print_pairing_code(session.key().as_str(), code);
        }
    }
}
