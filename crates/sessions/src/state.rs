//! Session lifecycle state machine.
//!
//! ```text
//! pairing ──authenticated──▶ authenticated ──ready──▶ ready
//!    │                             │                    │
//!    ├──auth failure──▶ failed ◀───┤                    │
//!    └──disconnected──▶ disconnected ◀─────────────────┘
//! ```
//!
//! A new pairing code while in `pairing` is not a transition; it only
//! replaces the stored code.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Pairing,
    Authenticated,
    Ready,
    Failed,
    Disconnected,
}

/// Rejected state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid lifecycle transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

impl LifecycleState {
    pub fn can_transition_to(&self, target: &LifecycleState) -> bool {
        self.valid_transitions().contains(target)
    }

    pub fn valid_transitions(&self) -> Vec<LifecycleState> {
        use LifecycleState::*;
        match self {
            Pairing => vec![Authenticated, Failed, Disconnected],
            Authenticated => vec![Ready, Failed, Disconnected],
            Ready => vec![Disconnected],
            Failed | Disconnected => vec![],
        }
    }

    pub fn transition_to(&self, target: LifecycleState) -> Result<LifecycleState, InvalidTransition> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Terminal sessions are dropped from the registry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Disconnected)
    }

    pub fn accepts_pairing_code(&self) -> bool {
        matches!(self, Self::Pairing)
    }

    /// Only ready sessions hand inbound messages to commands.
    pub fn dispatches_messages(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pairing => "pairing",
            Self::Authenticated => "authenticated",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    const ALL: [LifecycleState; 5] = [Pairing, Authenticated, Ready, Failed, Disconnected];

    #[test]
    fn happy_path() {
        let s = Pairing.transition_to(Authenticated).unwrap();
        let s = s.transition_to(Ready).unwrap();
        assert!(s.dispatches_messages());
        let s = s.transition_to(Disconnected).unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn ready_cannot_fail_or_go_back() {
        assert!(!Ready.can_transition_to(&Failed));
        assert!(!Ready.can_transition_to(&Pairing));
        assert!(!Ready.can_transition_to(&Authenticated));
    }

    #[test]
    fn pairing_cannot_skip_to_ready() {
        let err = Pairing.transition_to(Ready).unwrap_err();
        assert_eq!(err.from, Pairing);
        assert_eq!(err.to, Ready);
        assert_eq!(
            err.to_string(),
            "invalid lifecycle transition from pairing to ready"
        );
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for s in [Failed, Disconnected] {
            assert!(s.valid_transitions().is_empty());
            for t in ALL {
                assert!(!s.can_transition_to(&t));
            }
        }
    }

    #[test]
    fn every_live_state_can_disconnect() {
        for s in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(s.can_transition_to(&Disconnected), "{s} should disconnect");
        }
    }

    #[test]
    fn only_pairing_accepts_codes() {
        for s in ALL {
            assert_eq!(s.accepts_pairing_code(), s == Pairing);
        }
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_value(Authenticated).unwrap(), "authenticated");
        for s in ALL {
            assert_eq!(serde_json::to_value(s).unwrap(), s.as_str());
        }
    }
}
