//! Recording client for command tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use pb_domain::error::{Error, Result};
use pb_sessions::{IdentityKey, InboundMessage, MessagingClient, Session};

#[derive(Default)]
pub(crate) struct RecordingClient {
    pub replies: Mutex<Vec<String>>,
    /// Fail every reply whose text starts with this.
    pub fail_on: Mutex<Option<String>>,
}

#[async_trait]
impl MessagingClient for RecordingClient {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn reply(&self, _message: &InboundMessage, text: &str) -> Result<()> {
        let fail = self
            .fail_on
            .lock()
            .as_deref()
            .is_some_and(|p| text.starts_with(p));
        if fail {
            return Err(Error::Send("network refused the message".into()));
        }
        self.replies.lock().push(text.to_owned());
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn session_with_client() -> (Session, Arc<RecordingClient>) {
    let session = Session::new(IdentityKey::parse("15551234567").unwrap());
    let client = Arc::new(RecordingClient::default());
    session.attach_client(client.clone());
    (session, client)
}

pub(crate) fn message(body: &str) -> InboundMessage {
    InboundMessage {
        id: "3EB0C767D26A".into(),
        from: "4915112345@c.us".into(),
        body: body.into(),
        timestamp: 1_700_000_000,
    }
}
