//! [`MessagingClient`] implementation over a sidecar connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use pb_domain::error::Result;
use pb_protocol::BridgeMessage;
use pb_sessions::{InboundMessage, MessagingClient};

use crate::error::BridgeError;
use crate::pending::PendingReplies;

/// One session's connection to the sidecar.  Cheap handle: the socket is
/// driven by background tasks spawned by
/// [`BridgeClientFactory`](crate::factory::BridgeClientFactory).
pub struct BridgeClient {
    pub(crate) client_id: String,
    pub(crate) outbound: mpsc::Sender<BridgeMessage>,
    pub(crate) pending: Arc<PendingReplies>,
    pub(crate) reply_timeout: Duration,
    /// Stops the connection tasks.
    pub(crate) shutdown: CancellationToken,
    pub(crate) destroyed: AtomicBool,
}

impl BridgeClient {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Replies still waiting for their ack.
    pub fn pending_replies(&self) -> usize {
        self.pending.len()
    }

    async fn send(&self, msg: BridgeMessage) -> std::result::Result<(), BridgeError> {
        if self.shutdown.is_cancelled() {
            return Err(BridgeError::Closed);
        }
        self.outbound
            .send(msg)
            .await
            .map_err(|_| BridgeError::Closed)
    }
}

#[async_trait]
impl MessagingClient for BridgeClient {
    async fn initialize(&self) -> Result<()> {
        tracing::debug!(client_id = %self.client_id, "initializing client");
        self.send(BridgeMessage::Initialize).await?;
        Ok(())
    }

    async fn reply(&self, message: &InboundMessage, text: &str) -> Result<()> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let ack = self.pending.register(&request_id);

        let frame = BridgeMessage::Reply {
            request_id: request_id.clone(),
            chat_id: message.from.clone(),
            message_id: message.id.clone(),
            text: text.to_owned(),
        };
        if let Err(e) = self.send(frame).await {
            self.pending.forget(&request_id);
            return Err(e.into());
        }

        match tokio::time::timeout(self.reply_timeout, ack).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(BridgeError::Rejected(reason).into()),
            Ok(Err(_)) => Err(BridgeError::Closed.into()),
            Err(_) => {
                self.pending.forget(&request_id);
                tracing::warn!(
                    client_id = %self.client_id,
                    request_id = %request_id,
                    timeout_ms = self.reply_timeout.as_millis() as u64,
                    "reply_ack timeout"
                );
                Err(BridgeError::Timeout("reply_ack").into())
            }
        }
    }

    async fn destroy(&self) -> Result<()> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!(client_id = %self.client_id, "destroying client");
        // The writer closes the socket right after flushing `destroy`.
        if self.send(BridgeMessage::Destroy).await.is_err() {
            self.shutdown.cancel();
        }
        Ok(())
    }
}
