//! Session lifecycle controller.
//!
//! `start` creates (or finds) the session for a key, then waits a bounded
//! time for a pairing code while the client is built (with a deterministic
//! auth profile) and the handshake runs in a detached task.  Every client event for a session goes
//! through one pump task and one entry point ([`EventPump::apply`]), so
//! transitions are validated in one place and handled in emission order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::Instrument;

use pb_domain::config::SessionsConfig;
use pb_domain::error::{Error, Result};
use pb_domain::trace::TraceEvent;

use crate::client::{AuthProfile, ClientEvent, ClientFactory, EventStream, InboundMessage};
use crate::key::IdentityKey;
use crate::registry::SessionRegistry;
use crate::session::Session;
use crate::state::LifecycleState;

/// What the session does with traffic once it is up.
#[async_trait]
pub trait SessionHandler: Send + Sync {
    /// Called for every inbound message while the session is `ready`.
    async fn on_message(&self, message: &InboundMessage, session: &Session);

    /// Called whenever a new pairing code is stored.
    fn on_pairing_code(&self, _session: &Session, _code: &str) {}
}

/// Result of [`LifecycleController::start`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    AlreadyReady,
    PairingRequired { artifact: String },
    /// No pairing code yet; poll status.
    Initializing,
}

pub struct LifecycleController {
    registry: Arc<SessionRegistry>,
    factory: Arc<dyn ClientFactory>,
    pump: Arc<EventPump>,
    config: SessionsConfig,
}

impl LifecycleController {
    pub fn new(
        registry: Arc<SessionRegistry>,
        factory: Arc<dyn ClientFactory>,
        handler: Arc<dyn SessionHandler>,
        config: SessionsConfig,
    ) -> Self {
        let pump = Arc::new(EventPump {
            registry: registry.clone(),
            handler,
        });
        Self {
            registry,
            factory,
            pump,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    fn pairing_wait(&self) -> Duration {
        Duration::from_millis(self.config.pairing_wait_ms)
    }

    /// Start (or rejoin) the session for `key`.
    ///
    /// Client construction and the handshake run in the background; the
    /// caller waits at most the pairing wait for either of them to produce
    /// something worth reporting.  An existing `pairing`/`authenticated`
    /// session is reused, never duplicated.
    pub async fn start(&self, key: &IdentityKey) -> Result<StartOutcome> {
        let (session, is_new) = self.registry.get_or_create(key);

        if is_new {
            let profile = AuthProfile {
                client_id: key.auth_profile_id(&self.config.auth_profile_prefix),
                data_path: self.config.auth_data_path.clone(),
                launch: self.config.launch.clone(),
            };
            tokio::spawn(
                self.pump
                    .clone()
                    .connect(session.clone(), self.factory.clone(), profile),
            );
        } else if session.state() == LifecycleState::Ready {
            tracing::debug!(session_key = %key, "session already ready");
            return Ok(StartOutcome::AlreadyReady);
        } else {
            tracing::debug!(
                session_key = %key,
                state = %session.state(),
                "session already starting, rejoining pairing wait"
            );
        }

        self.await_pairing(&session).await
    }

    /// Wait until a pairing code shows up, the session leaves `pairing`, or
    /// the pairing wait elapses, whichever comes first.
    async fn await_pairing(&self, session: &Session) -> Result<StartOutcome> {
        let mut rx = session.subscribe();
        let waited = tokio::time::timeout(
            self.pairing_wait(),
            rx.wait_for(|s| s.pairing_code.is_some() || s.state != LifecycleState::Pairing),
        )
        .await
        .is_ok();

        let status = session.status();
        if !waited {
            tracing::debug!(
                session_key = %session.key(),
                wait_ms = self.config.pairing_wait_ms,
                "no pairing code within wait"
            );
        }

        match status.state {
            LifecycleState::Ready => Ok(StartOutcome::AlreadyReady),
            LifecycleState::Pairing => Ok(match status.pairing_code {
                Some(artifact) => StartOutcome::PairingRequired { artifact },
                None => StartOutcome::Initializing,
            }),
            LifecycleState::Authenticated => Ok(StartOutcome::Initializing),
            LifecycleState::Failed | LifecycleState::Disconnected => {
                let reason = status
                    .reason
                    .unwrap_or_else(|| format!("session {}", status.state));
                if status.state == LifecycleState::Failed && session.client().is_none() {
                    Err(Error::Construction(reason))
                } else {
                    Err(Error::Handshake(reason))
                }
            }
        }
    }

    /// Explicit disconnect.  Returns `false` when no session was registered.
    pub async fn stop(&self, key: &IdentityKey) -> bool {
        let Some(session) = self.registry.remove(key) else {
            return false;
        };
        self.pump
            .finish(&session, LifecycleState::Disconnected, "stopped by request")
            .await;
        true
    }

    /// Tear down every session (process shutdown).
    pub async fn shutdown(&self) {
        let sessions = self.registry.drain();
        if sessions.is_empty() {
            return;
        }
        tracing::info!(sessions = sessions.len(), "destroying sessions");
        futures_util::future::join_all(sessions.iter().map(|s| {
            self.pump
                .finish(s, LifecycleState::Disconnected, "gateway shutting down")
        }))
        .await;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Event handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct EventPump {
    registry: Arc<SessionRegistry>,
    handler: Arc<dyn SessionHandler>,
}

impl EventPump {
    /// Build the client for a fresh session, start its event pump and
    /// begin the handshake.  Runs detached from `start`.
    async fn connect(
        self: Arc<Self>,
        session: Arc<Session>,
        factory: Arc<dyn ClientFactory>,
        profile: AuthProfile,
    ) {
        let client_id = profile.client_id.clone();
        let (client, events) = match factory.create(profile).await {
            Ok(built) => built,
            Err(e) => {
                tracing::error!(session_key = %session.key(), error = %e, "client construction failed");
                // Unregister first: whoever the failure wakes may start over.
                self.registry.remove_instance(&session);
                if let Err(t) = session.transition(LifecycleState::Failed, Some(e.to_string())) {
                    tracing::debug!(session_key = %session.key(), error = %t, "session closed before construction failed");
                }
                return;
            }
        };

        session.attach_client(client.clone());
        if session.state().is_terminal() {
            tracing::debug!(session_key = %session.key(), "session closed during construction, releasing client");
            self.destroy_client(&session).await;
            return;
        }
        TraceEvent::SessionCreated {
            session_key: session.key().to_string(),
            session_id: session.id().to_string(),
            client_id,
        }
        .emit();

        self.spawn_event_pump(session.clone(), events);

        if let Err(e) = client.initialize().await {
            tracing::warn!(session_key = %session.key(), error = %e, "client initialize failed");
            self.apply(&session, ClientEvent::AuthFailure(format!("initialize failed: {e}")))
                .await;
        }
    }

    fn spawn_event_pump(self: &Arc<Self>, session: Arc<Session>, mut events: EventStream) {
        let pump = self.clone();
        let span = tracing::info_span!(
            "session_events",
            session_key = %session.key(),
            session_id = %session.id(),
        );

        tokio::spawn(
            async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = session.closed() => break,
                        event = events.recv() => match event {
                            Some(event) => pump.apply(&session, event).await,
                            None => {
                                pump.apply(
                                    &session,
                                    ClientEvent::Disconnected("event stream closed".into()),
                                )
                                .await;
                                break;
                            }
                        },
                    }
                }
                tracing::debug!("event pump stopped");
            }
            .instrument(span),
        );
    }

    /// The single entry point for client events.
    async fn apply(&self, session: &Session, event: ClientEvent) {
        match event {
            ClientEvent::PairingCode(code) => {
                if session.set_pairing_code(code.clone()) {
                    TraceEvent::PairingCodeIssued {
                        session_key: session.key().to_string(),
                        code_chars: code.len(),
                    }
                    .emit();
                    self.handler.on_pairing_code(session, &code);
                } else {
                    tracing::debug!(state = %session.state(), "pairing code ignored");
                }
            }
            ClientEvent::Authenticated => {
                self.transition(session, LifecycleState::Authenticated, None)
                    .await;
            }
            ClientEvent::Ready(info) => {
                let phone = info.phone.clone();
                match session.mark_ready(info) {
                    Ok(from) => {
                        tracing::info!(phone = %phone, "client is ready");
                        self.trace_transition(session, from, LifecycleState::Ready, None);
                    }
                    Err(e) => tracing::warn!(error = %e, "ignoring ready event"),
                }
            }
            ClientEvent::AuthFailure(reason) => {
                tracing::warn!(reason = %reason, "authentication failed");
                self.transition(session, LifecycleState::Failed, Some(reason))
                    .await;
            }
            ClientEvent::Disconnected(reason) => {
                tracing::info!(reason = %reason, "client disconnected");
                self.transition(session, LifecycleState::Disconnected, Some(reason))
                    .await;
            }
            ClientEvent::Message(message) => {
                if session.state().dispatches_messages() {
                    self.handler.on_message(&message, session).await;
                } else {
                    tracing::debug!(
                        state = %session.state(),
                        message_id = %message.id,
                        "dropping message, session not ready"
                    );
                }
            }
        }
    }

    async fn transition(&self, session: &Session, to: LifecycleState, reason: Option<String>) {
        match session.transition(to, reason.clone()) {
            Ok(from) => {
                self.trace_transition(session, from, to, reason);
                if to.is_terminal() {
                    self.retire(session).await;
                }
            }
            Err(e) => tracing::warn!(error = %e, "ignoring lifecycle event"),
        }
    }

    fn trace_transition(
        &self,
        session: &Session,
        from: LifecycleState,
        to: LifecycleState,
        reason: Option<String>,
    ) {
        TraceEvent::SessionTransition {
            session_key: session.key().to_string(),
            session_id: session.id().to_string(),
            from: from.to_string(),
            to: to.to_string(),
            reason,
        }
        .emit();
    }

    /// Unregister a terminal session and release its client.
    async fn retire(&self, session: &Session) {
        if self.registry.remove_instance(session) {
            TraceEvent::SessionRemoved {
                session_key: session.key().to_string(),
                session_id: session.id().to_string(),
                state: session.state().to_string(),
            }
            .emit();
        }
        self.destroy_client(session).await;
    }

    /// Force a session (already unregistered) into a terminal state.
    async fn finish(&self, session: &Session, to: LifecycleState, reason: &str) {
        if let Ok(from) = session.transition(to, Some(reason.to_owned())) {
            self.trace_transition(session, from, to, Some(reason.to_owned()));
        }
        TraceEvent::SessionRemoved {
            session_key: session.key().to_string(),
            session_id: session.id().to_string(),
            state: session.state().to_string(),
        }
        .emit();
        self.destroy_client(session).await;
    }

    async fn destroy_client(&self, session: &Session) {
        let Some(client) = session.client() else {
            return;
        };
        let started = Instant::now();
        if let Err(e) = client.destroy().await {
            tracing::warn!(session_key = %session.key(), error = %e, "client destroy failed");
        } else {
            tracing::debug!(
                session_key = %session.key(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "client destroyed"
            );
        }
    }
}
