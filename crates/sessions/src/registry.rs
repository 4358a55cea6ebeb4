//! Process-wide registry of sessions, at most one live session per key.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::key::IdentityKey;
use crate::session::Session;
use crate::state::LifecycleState;

/// Status entry reported for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Thread-safe map of identity key → session.
///
/// Owned by the application state; nothing here is a global.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<IdentityKey, Arc<Session>>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the live session for `key`, or register a new one in
    /// `pairing`.  Returns `(session, is_new)`.
    ///
    /// A session found in a terminal state (its removal still in flight) is
    /// replaced.  Check and insert happen under one write lock, so two
    /// concurrent callers never both get `is_new = true`.
    pub fn get_or_create(&self, key: &IdentityKey) -> (Arc<Session>, bool) {
        // Fast path: live session already registered.
        {
            let sessions = self.sessions.read();
            if let Some(existing) = sessions.get(key) {
                if !existing.state().is_terminal() {
                    return (existing.clone(), false);
                }
            }
        }

        let mut sessions = self.sessions.write();
        if let Some(existing) = sessions.get(key) {
            if !existing.state().is_terminal() {
                return (existing.clone(), false);
            }
        }

        let session = Arc::new(Session::new(key.clone()));
        sessions.insert(key.clone(), session.clone());
        tracing::info!(
            session_key = %key,
            session_id = %session.id(),
            sessions = sessions.len(),
            "session registered"
        );
        (session, true)
    }

    pub fn get(&self, key: &IdentityKey) -> Option<Arc<Session>> {
        self.sessions.read().get(key).cloned()
    }

    /// Drop the entry for `key`.  Idempotent.
    pub fn remove(&self, key: &IdentityKey) -> Option<Arc<Session>> {
        let removed = self.sessions.write().remove(key);
        if let Some(ref s) = removed {
            tracing::info!(session_key = %key, session_id = %s.id(), "session removed");
        }
        removed
    }

    /// Drop `session` only if it is still the one registered under its key.
    /// A late event from a replaced session must not evict its successor.
    pub fn remove_instance(&self, session: &Session) -> bool {
        let mut sessions = self.sessions.write();
        let matches = sessions
            .get(session.key())
            .is_some_and(|s| s.id() == session.id());
        if matches {
            sessions.remove(session.key());
            tracing::info!(
                session_key = %session.key(),
                session_id = %session.id(),
                "session removed"
            );
        }
        matches
    }

    /// Point-in-time status of every live session.
    ///
    /// The map lock is held only while cloning the handles; statuses are
    /// read afterwards, so snapshots never stall event handling.
    pub fn snapshot(&self) -> BTreeMap<String, SessionSnapshot> {
        let handles: Vec<Arc<Session>> = self.sessions.read().values().cloned().collect();

        handles
            .into_iter()
            .filter_map(|s| {
                let status = s.status();
                if status.state.is_terminal() {
                    return None;
                }
                Some((
                    s.key().to_string(),
                    SessionSnapshot {
                        status: status.state,
                        phone: status.info.map(|i| i.phone),
                    },
                ))
            })
            .collect()
    }

    /// Remove and return every session (shutdown).
    pub fn drain(&self) -> Vec<Arc<Session>> {
        self.sessions.write().drain().map(|(_, s)| s).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
