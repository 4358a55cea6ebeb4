use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use pb_domain::error::{Error, Result};

use crate::client::{ClientInfo, InboundMessage, MessagingClient};
use crate::key::IdentityKey;
use crate::state::{InvalidTransition, LifecycleState};

/// Observable part of a session.  Published through a watch channel so
/// `start` can wait on it and status reads never block event handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: LifecycleState,
    /// Latest pairing code; only held while `pairing`.
    pub pairing_code: Option<String>,
    /// Set iff the session reached `ready`.
    pub info: Option<ClientInfo>,
    /// Why the session ended, for terminal states.
    pub reason: Option<String>,
}

impl SessionStatus {
    fn initial() -> Self {
        Self {
            state: LifecycleState::Pairing,
            pairing_code: None,
            info: None,
            reason: None,
        }
    }
}

/// One bot session: a messaging client plus its lifecycle state.
pub struct Session {
    key: IdentityKey,
    id: Uuid,
    created_at: DateTime<Utc>,
    status: watch::Sender<SessionStatus>,
    client: OnceLock<Arc<dyn MessagingClient>>,
    /// Cancelled once the session reaches a terminal state.
    cancel: CancellationToken,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl Session {
    /// A fresh session in `pairing`, with no client attached yet.
    pub fn new(key: IdentityKey) -> Self {
        let (status, _) = watch::channel(SessionStatus::initial());
        Self {
            key,
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            status,
            client: OnceLock::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Attach the underlying client.  Only the first call has an effect.
    pub fn attach_client(&self, client: Arc<dyn MessagingClient>) -> bool {
        self.client.set(client).is_ok()
    }

    pub fn client(&self) -> Option<&Arc<dyn MessagingClient>> {
        self.client.get()
    }

    pub fn state(&self) -> LifecycleState {
        self.status.borrow().state
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Resolves when the session reaches a terminal state.
    pub async fn closed(&self) {
        self.cancel.cancelled().await
    }

    /// Reply to `message` through this session's client.
    pub async fn reply(&self, message: &InboundMessage, text: &str) -> Result<()> {
        let client = self
            .client()
            .ok_or_else(|| Error::NotConnected(self.key.to_string()))?;
        client.reply(message, text).await
    }

    /// Store a pairing code.  Ignored (returns `false`) outside `pairing`.
    pub fn set_pairing_code(&self, code: String) -> bool {
        self.status.send_if_modified(|s| {
            if s.state.accepts_pairing_code() {
                s.pairing_code = Some(code);
                true
            } else {
                false
            }
        })
    }

    /// Move to `to`.  Returns the previous state.  Check and update happen
    /// under one write, so concurrent events cannot interleave.
    pub fn transition(
        &self,
        to: LifecycleState,
        reason: Option<String>,
    ) -> Result<LifecycleState, InvalidTransition> {
        self.advance(to, reason, None)
    }

    /// `authenticated → ready`, recording the account info.
    pub fn mark_ready(&self, info: ClientInfo) -> Result<LifecycleState, InvalidTransition> {
        self.advance(LifecycleState::Ready, None, Some(info))
    }

    fn advance(
        &self,
        to: LifecycleState,
        reason: Option<String>,
        info: Option<ClientInfo>,
    ) -> Result<LifecycleState, InvalidTransition> {
        let mut outcome = None;
        self.status.send_if_modified(|s| match s.state.transition_to(to) {
            Ok(next) => {
                outcome = Some(Ok(s.state));
                s.state = next;
                s.pairing_code = None;
                if info.is_some() {
                    s.info = info;
                }
                if next.is_terminal() {
                    s.info = None;
                    s.reason = reason;
                }
                true
            }
            Err(e) => {
                outcome = Some(Err(e));
                false
            }
        });

        let outcome = outcome.unwrap_or_else(|| {
            Err(InvalidTransition {
                from: self.state(),
                to,
            })
        });
        if to.is_terminal() && outcome.is_ok() {
            self.cancel.cancel();
        }
        outcome
    }
}
