use serde::Serialize;

/// Structured trace events emitted across all pairbot crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session_key: String,
        session_id: String,
        client_id: String,
    },
    SessionTransition {
        session_key: String,
        session_id: String,
        from: String,
        to: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    SessionRemoved {
        session_key: String,
        session_id: String,
        state: String,
    },
    PairingCodeIssued {
        session_key: String,
        code_chars: usize,
    },
    CommandDispatched {
        session_key: String,
        command: String,
        duration_ms: u64,
        ok: bool,
    },
    AutoReplySent {
        session_key: String,
        keyword: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "pb_event");
    }
}
