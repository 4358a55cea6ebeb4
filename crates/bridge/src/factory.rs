//! Connection setup and the per-connection reader, writer and heartbeat
//! tasks.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use pb_domain::config::{BridgeConfig, SessionsConfig};
use pb_domain::error::Result;
use pb_protocol::{BridgeMessage, LaunchOptions, PROTOCOL_VERSION};
use pb_sessions::{
    AuthProfile, ClientEvent, ClientFactory, ClientInfo, EventStream, InboundMessage,
    MessagingClient,
};

use crate::client::BridgeClient;
use crate::error::BridgeError;
use crate::pending::PendingReplies;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CLOSED_REASON: &str = "bridge connection closed";

/// Builds [`BridgeClient`]s, one sidecar connection each.
pub struct BridgeClientFactory {
    config: BridgeConfig,
    token: Option<String>,
    event_buffer: usize,
}

impl BridgeClientFactory {
    /// Reads the sidecar token from `config.token_env`.
    pub fn new(config: BridgeConfig, sessions: &SessionsConfig) -> Self {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        if token.is_none() {
            tracing::debug!(env = %config.token_env, "no bridge token set");
        }
        Self {
            config,
            token,
            event_buffer: sessions.event_buffer.max(1),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Connection URL with auth params.
    fn build_url(&self, client_id: &str) -> String {
        let base = &self.config.url;
        let sep = if base.contains('?') { "&" } else { "?" };
        match &self.token {
            Some(token) => format!("{base}{sep}token={token}&client_id={client_id}"),
            None => format!("{base}{sep}client_id={client_id}"),
        }
    }

    async fn connect(
        &self,
        profile: AuthProfile,
    ) -> std::result::Result<(BridgeClient, EventStream), BridgeError> {
        let url = self.build_url(&profile.client_id);
        tracing::info!(url = %self.config.url, client_id = %profile.client_id, "connecting to sidecar");

        let connect_timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let (ws, _response) = tokio::time::timeout(
            connect_timeout,
            tokio_tungstenite::connect_async(url.as_str()),
        )
        .await
        .map_err(|_| BridgeError::Timeout("sidecar connection"))??;
        let (mut sink, mut stream) = ws.split();

        // ── Send client_hello ────────────────────────────────────────
        let hello = BridgeMessage::ClientHello {
            protocol_version: PROTOCOL_VERSION,
            client_id: profile.client_id.clone(),
            data_path: profile
                .data_path
                .as_ref()
                .map(|p| p.display().to_string()),
            launch: LaunchOptions {
                headless: profile.launch.headless,
                args: profile.launch.args.clone(),
            },
        };
        sink.send(Message::Text(serde_json::to_string(&hello)?))
            .await?;

        // ── Wait for sidecar_welcome ─────────────────────────────────
        let welcome_timeout = Duration::from_secs(self.config.welcome_timeout_secs);
        let sidecar_version = tokio::time::timeout(welcome_timeout, async {
            while let Some(Ok(msg)) = stream.next().await {
                if let Message::Text(text) = msg {
                    if let Ok(BridgeMessage::SidecarWelcome { sidecar_version }) =
                        serde_json::from_str(&text)
                    {
                        return Ok(sidecar_version);
                    }
                }
            }
            Err(BridgeError::Handshake(
                "connection closed before sidecar_welcome".into(),
            ))
        })
        .await
        .map_err(|_| BridgeError::Timeout("sidecar_welcome"))??;

        tracing::info!(
            client_id = %profile.client_id,
            sidecar_version = %sidecar_version,
            "sidecar welcomed us"
        );

        // ── Spawn connection tasks ───────────────────────────────────
        let (outbound_tx, outbound_rx) = mpsc::channel::<BridgeMessage>(64);
        let (events_tx, events_rx) = mpsc::channel::<ClientEvent>(self.event_buffer);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let pending = Arc::new(PendingReplies::new());
        let shutdown = CancellationToken::new();
        let span = tracing::info_span!("bridge", client_id = %profile.client_id);

        tokio::spawn(write_loop(sink, outbound_rx, shutdown.clone()).instrument(span.clone()));
        tokio::spawn(
            heartbeat_loop(
                outbound_tx.clone(),
                Duration::from_secs(self.config.heartbeat_interval_secs.max(1)),
                shutdown.clone(),
            )
            .instrument(span.clone()),
        );
        tokio::spawn(forward_events(queue_rx, events_tx).instrument(span.clone()));
        tokio::spawn(
            read_loop(
                stream,
                ReaderCtx {
                    events: queue_tx,
                    outbound: outbound_tx.clone(),
                    pending: pending.clone(),
                    shutdown: shutdown.clone(),
                    max_frame_bytes: self.config.max_frame_bytes,
                },
            )
            .instrument(span),
        );

        let client = BridgeClient {
            client_id: profile.client_id,
            outbound: outbound_tx,
            pending,
            reply_timeout: Duration::from_secs(self.config.reply_timeout_secs),
            shutdown,
            destroyed: AtomicBool::new(false),
        };
        Ok((client, events_rx))
    }
}

#[async_trait]
impl ClientFactory for BridgeClientFactory {
    async fn create(
        &self,
        profile: AuthProfile,
    ) -> Result<(Arc<dyn MessagingClient>, EventStream)> {
        let (client, events) = self.connect(profile).await?;
        Ok((Arc::new(client), events))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connection tasks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Serializes outbound frames.  A `destroy` frame is followed by a close.
async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut outbound: mpsc::Receiver<BridgeMessage>,
    shutdown: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = shutdown.cancelled() => break,
            msg = outbound.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        let json = match serde_json::to_string(&msg) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize outbound frame");
                continue;
            }
        };
        if sink.send(Message::Text(json)).await.is_err() {
            break;
        }
        if matches!(msg, BridgeMessage::Destroy) {
            break;
        }
    }
    let _ = sink.close().await;
    tracing::debug!("writer stopped");
}

async fn heartbeat_loop(
    outbound: mpsc::Sender<BridgeMessage>,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                let ping = BridgeMessage::Ping {
                    timestamp: Utc::now().timestamp_millis(),
                };
                if outbound.send(ping).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Moves events from the reader's queue into the session's bounded stream.
///
/// The reader never waits on the session: acks and heartbeats keep flowing
/// while the session is busy with an earlier message.
async fn forward_events(
    mut queue: mpsc::UnboundedReceiver<ClientEvent>,
    events: mpsc::Sender<ClientEvent>,
) {
    while let Some(event) = queue.recv().await {
        if events.send(event).await.is_err() {
            tracing::debug!("event receiver dropped");
            break;
        }
    }
}

struct ReaderCtx {
    events: mpsc::UnboundedSender<ClientEvent>,
    outbound: mpsc::Sender<BridgeMessage>,
    pending: Arc<PendingReplies>,
    shutdown: CancellationToken,
    max_frame_bytes: usize,
}

/// Turns sidecar frames into client events, in arrival order.
async fn read_loop(mut stream: SplitStream<WsStream>, ctx: ReaderCtx) {
    while let Some(Ok(msg)) = stream.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => {
                tracing::info!("sidecar closed connection");
                break;
            }
            _ => continue,
        };

        if text.len() > ctx.max_frame_bytes {
            tracing::warn!(
                bytes = text.len(),
                max = ctx.max_frame_bytes,
                "frame exceeds max_frame_bytes, dropping"
            );
            continue;
        }

        let frame = match serde_json::from_str::<BridgeMessage>(&text) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!(error = %e, "failed to parse frame");
                continue;
            }
        };

        let event = match frame {
            BridgeMessage::Qr { code } => ClientEvent::PairingCode(code),
            BridgeMessage::Authenticated => ClientEvent::Authenticated,
            BridgeMessage::Ready { info } => ClientEvent::Ready(ClientInfo {
                phone: info.phone,
                push_name: info.push_name,
                platform: info.platform,
            }),
            BridgeMessage::AuthFailure { reason } => ClientEvent::AuthFailure(reason),
            BridgeMessage::Disconnected { reason } => ClientEvent::Disconnected(reason),
            BridgeMessage::Message { message } => ClientEvent::Message(InboundMessage {
                id: message.id,
                from: message.from,
                body: message.body,
                timestamp: message.timestamp,
            }),
            BridgeMessage::ReplyAck {
                request_id,
                ok,
                error,
            } => {
                ctx.pending.resolve(&request_id, ok, error);
                continue;
            }
            BridgeMessage::Ping { timestamp } => {
                let _ = ctx.outbound.send(BridgeMessage::Pong { timestamp }).await;
                continue;
            }
            BridgeMessage::Pong { .. } => {
                tracing::trace!("received pong");
                continue;
            }
            other => {
                tracing::debug!(frame = other.kind(), "ignoring frame");
                continue;
            }
        };

        if ctx.events.send(event).is_err() {
            tracing::debug!("event forwarder stopped");
            break;
        }
    }

    ctx.pending.fail_all(CLOSED_REASON);
    ctx.shutdown.cancel();
    let _ = ctx
        .events
        .send(ClientEvent::Disconnected(CLOSED_REASON.into()));
    tracing::debug!("reader stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(url: &str) -> BridgeClientFactory {
        BridgeClientFactory::new(
            BridgeConfig {
                url: url.into(),
                ..Default::default()
            },
            &SessionsConfig::default(),
        )
    }

    #[test]
    fn build_url_with_token() {
        let f = factory("ws://localhost:3300/v1/clients").with_token(Some("secret".into()));
        assert_eq!(
            f.build_url("pairbot-1555"),
            "ws://localhost:3300/v1/clients?token=secret&client_id=pairbot-1555"
        );
    }

    #[test]
    fn build_url_without_token() {
        let f = factory("ws://localhost:3300/v1/clients").with_token(None);
        assert_eq!(
            f.build_url("pairbot-1555"),
            "ws://localhost:3300/v1/clients?client_id=pairbot-1555"
        );
    }

    #[test]
    fn build_url_keeps_existing_query() {
        let f = factory("ws://localhost:3300/v1/clients?region=eu").with_token(None);
        assert_eq!(
            f.build_url("pairbot-1555"),
            "ws://localhost:3300/v1/clients?region=eu&client_id=pairbot-1555"
        );
    }
}
