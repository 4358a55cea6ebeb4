//! Replies awaiting their `reply_ack`.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Outcome delivered to a waiting `reply`: `Err` carries the sidecar's
/// error text.
pub type AckResult = Result<(), String>;

/// Map of `request_id` → waiter.  Entries leave the map when acknowledged,
/// timed out, or failed on disconnect.
#[derive(Default)]
pub struct PendingReplies {
    pending: Mutex<HashMap<String, oneshot::Sender<AckResult>>>,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, request_id: &str) -> oneshot::Receiver<AckResult> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id.to_owned(), tx);
        rx
    }

    /// Deliver an ack.  Returns `false` for unknown (late or duplicate) IDs.
    pub fn resolve(&self, request_id: &str, ok: bool, error: Option<String>) -> bool {
        let Some(tx) = self.pending.lock().remove(request_id) else {
            tracing::debug!(request_id = %request_id, "ack for unknown request");
            return false;
        };
        let outcome = if ok {
            Ok(())
        } else {
            Err(error.unwrap_or_else(|| "unspecified error".into()))
        };
        let _ = tx.send(outcome);
        true
    }

    /// Drop a waiter (its caller gave up).
    pub fn forget(&self, request_id: &str) {
        self.pending.lock().remove(request_id);
    }

    /// Fail every waiter, e.g. when the connection drops.
    pub fn fail_all(&self, reason: &str) {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        if !drained.is_empty() {
            tracing::warn!(count = drained.len(), reason = %reason, "failing pending replies");
        }
        for (_, tx) in drained {
            let _ = tx.send(Err(reason.to_owned()));
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ack_resolves_waiter() {
        let p = PendingReplies::new();
        let rx = p.register("r1");
        assert!(p.resolve("r1", true, None));
        assert_eq!(rx.await.unwrap(), Ok(()));
        assert!(p.is_empty());
    }

    #[tokio::test]
    async fn negative_ack_carries_error() {
        let p = PendingReplies::new();
        let rx = p.register("r1");
        p.resolve("r1", false, Some("chat not found".into()));
        assert_eq!(rx.await.unwrap(), Err("chat not found".to_string()));
    }

    #[test]
    fn unknown_ack_is_ignored() {
        let p = PendingReplies::new();
        assert!(!p.resolve("nope", true, None));
    }

    #[tokio::test]
    async fn fail_all_drains() {
        let p = PendingReplies::new();
        let a = p.register("a");
        let b = p.register("b");
        p.fail_all("bridge connection closed");
        assert!(p.is_empty());
        assert!(a.await.unwrap().is_err());
        assert!(b.await.unwrap().is_err());
    }

    #[test]
    fn forget_removes_entry() {
        let p = PendingReplies::new();
        let _rx = p.register("a");
        p.forget("a");
        assert_eq!(p.len(), 0);
    }
}
