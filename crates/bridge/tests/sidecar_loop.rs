//! Integration test: boots an in-process WebSocket server playing the
//! sidecar, connects a real [`BridgeClientFactory`], and drives the
//! handshake, lifecycle events, reply acks and disconnect handling.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use pb_bridge::BridgeClientFactory;
use pb_domain::config::{BridgeConfig, LaunchConfig, SessionsConfig};
use pb_domain::error::Error;
use pb_protocol::{BridgeMessage, WireClientInfo, WireMessage};
use pb_sessions::{
    AuthProfile, ClientEvent, ClientFactory, EventStream, InboundMessage, MessagingClient,
};

// ── Mini sidecar: in-process WS server ──────────────────────────────────

/// What the gateway sent in its `client_hello`, plus the request URI.
#[derive(Debug, Clone)]
struct CapturedHello {
    uri: String,
    client_id: String,
    data_path: Option<String>,
    launch_args: Vec<String>,
}

/// Handle to one accepted connection.
struct SidecarConn {
    hello: CapturedHello,
    /// Frames to push to the gateway; `None` closes the socket.
    send: mpsc::Sender<Option<BridgeMessage>>,
    /// Frames received from the gateway.
    recv: mpsc::Receiver<BridgeMessage>,
}

impl SidecarConn {
    async fn push(&self, msg: BridgeMessage) {
        self.send.send(Some(msg)).await.unwrap();
    }

    async fn hang_up(&self) {
        self.send.send(None).await.unwrap();
    }

    /// Next frame that is not a heartbeat.
    async fn expect_frame(&mut self) -> BridgeMessage {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            match tokio::time::timeout_at(deadline, self.recv.recv()).await {
                Ok(Some(BridgeMessage::Ping { .. } | BridgeMessage::Pong { .. })) => continue,
                Ok(Some(msg)) => return msg,
                Ok(None) => panic!("gateway dropped the connection"),
                Err(_) => panic!("timeout waiting for gateway frame"),
            }
        }
    }
}

/// Boots a sidecar on an ephemeral port.  `welcome = false` makes it accept
/// the socket but never answer the hello.
async fn start_mini_sidecar(welcome: bool) -> (SocketAddr, mpsc::Receiver<SidecarConn>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (conn_tx, conn_rx) = mpsc::channel(4);

    tokio::spawn(async move {
        while let Ok((stream, _peer)) = listener.accept().await {
            let conn_tx = conn_tx.clone();
            tokio::spawn(async move {
                let uri = Arc::new(parking_lot::Mutex::new(String::new()));
                let uri_slot = uri.clone();
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    *uri_slot.lock() = req.uri().to_string();
                    Ok(resp)
                };
                let ws = tokio_tungstenite::accept_hdr_async(stream, callback)
                    .await
                    .unwrap();
                let (mut sink, mut stream) = ws.split();

                let hello = loop {
                    match stream.next().await {
                        Some(Ok(Message::Text(text))) => {
                            if let Ok(BridgeMessage::ClientHello {
                                client_id,
                                data_path,
                                launch,
                                ..
                            }) = serde_json::from_str(&text)
                            {
                                break CapturedHello {
                                    uri: uri.lock().clone(),
                                    client_id,
                                    data_path,
                                    launch_args: launch.args,
                                };
                            }
                        }
                        _ => return,
                    }
                };

                if !welcome {
                    // Hold the socket open without answering.
                    while stream.next().await.is_some() {}
                    return;
                }

                let welcome = BridgeMessage::SidecarWelcome {
                    sidecar_version: "0.0.0-test".into(),
                };
                let json = serde_json::to_string(&welcome).unwrap();
                if sink.send(Message::Text(json)).await.is_err() {
                    return;
                }

                let (push_tx, mut push_rx) = mpsc::channel::<Option<BridgeMessage>>(16);
                let (recv_tx, recv_rx) = mpsc::channel::<BridgeMessage>(16);
                let _ = conn_tx
                    .send(SidecarConn {
                        hello,
                        send: push_tx,
                        recv: recv_rx,
                    })
                    .await;

                let read_task = tokio::spawn(async move {
                    while let Some(Ok(msg)) = stream.next().await {
                        if let Message::Text(text) = msg {
                            if let Ok(frame) = serde_json::from_str::<BridgeMessage>(&text) {
                                let _ = recv_tx.send(frame).await;
                            }
                        }
                    }
                });

                let write_task = tokio::spawn(async move {
                    while let Some(next) = push_rx.recv().await {
                        match next {
                            Some(msg) => {
                                let json = serde_json::to_string(&msg).unwrap();
                                if sink.send(Message::Text(json)).await.is_err() {
                                    break;
                                }
                            }
                            None => {
                                let _ = sink.close().await;
                                break;
                            }
                        }
                    }
                });

                let _ = tokio::join!(read_task, write_task);
            });
        }
    });

    (addr, conn_rx)
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn factory(addr: SocketAddr, reply_timeout_secs: u64) -> BridgeClientFactory {
    let config = BridgeConfig {
        url: format!("ws://{addr}/v1/clients"),
        connect_timeout_secs: 2,
        welcome_timeout_secs: 1,
        reply_timeout_secs,
        ..Default::default()
    };
    BridgeClientFactory::new(config, &SessionsConfig::default()).with_token(Some("s3cret".into()))
}

fn profile() -> AuthProfile {
    AuthProfile {
        client_id: "pairbot-15551234567".into(),
        data_path: Some("/tmp/pairbot-auth".into()),
        launch: LaunchConfig::default(),
    }
}

fn inbound() -> InboundMessage {
    InboundMessage {
        id: "3EB0C767D26A".into(),
        from: "4915112345@c.us".into(),
        body: ".ping".into(),
        timestamp: 1_700_000_000,
    }
}

async fn next_event(events: &mut EventStream) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timeout waiting for client event")
        .expect("event stream closed")
}

async fn connected(
    reply_timeout_secs: u64,
) -> (Arc<dyn MessagingClient>, EventStream, SidecarConn) {
    let (addr, mut conns) = start_mini_sidecar(true).await;
    let (client, events) = factory(addr, reply_timeout_secs)
        .create(profile())
        .await
        .expect("bridge connect");
    let conn = tokio::time::timeout(Duration::from_secs(5), conns.recv())
        .await
        .unwrap()
        .unwrap();
    (client, events, conn)
}

// ── Tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn hello_carries_profile_and_auth() {
    let (_client, _events, conn) = connected(5).await;
    assert_eq!(conn.hello.client_id, "pairbot-15551234567");
    assert_eq!(conn.hello.data_path.as_deref(), Some("/tmp/pairbot-auth"));
    assert!(conn.hello.launch_args.iter().any(|a| a == "--no-sandbox"));
    assert!(conn.hello.uri.contains("token=s3cret"));
    assert!(conn.hello.uri.contains("client_id=pairbot-15551234567"));
}

#[tokio::test]
async fn lifecycle_frames_become_events_in_order() {
    let (client, mut events, mut conn) = connected(5).await;

    client.initialize().await.unwrap();
    assert_eq!(conn.expect_frame().await, BridgeMessage::Initialize);

    conn.push(BridgeMessage::Qr { code: "abc123".into() }).await;
    conn.push(BridgeMessage::Qr { code: "def456".into() }).await;
    conn.push(BridgeMessage::Authenticated).await;
    conn.push(BridgeMessage::Ready {
        info: WireClientInfo {
            phone: "15551234567".into(),
            push_name: Some("Shop".into()),
            platform: None,
        },
    })
    .await;
    conn.push(BridgeMessage::Message {
        message: WireMessage {
            id: "m1".into(),
            from: "4915112345@c.us".into(),
            body: "hello".into(),
            timestamp: 1,
        },
    })
    .await;

    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::PairingCode("abc123".into())
    );
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::PairingCode("def456".into())
    );
    assert_eq!(next_event(&mut events).await, ClientEvent::Authenticated);
    match next_event(&mut events).await {
        ClientEvent::Ready(info) => {
            assert_eq!(info.phone, "15551234567");
            assert_eq!(info.push_name.as_deref(), Some("Shop"));
        }
        other => panic!("expected ready, got {other:?}"),
    }
    match next_event(&mut events).await {
        ClientEvent::Message(m) => assert_eq!(m.body, "hello"),
        other => panic!("expected message, got {other:?}"),
    }
}

#[tokio::test]
async fn reply_waits_for_ack() {
    let (client, _events, mut conn) = connected(5).await;

    let replier = {
        let client = client.clone();
        tokio::spawn(async move { client.reply(&inbound(), "Pong!").await })
    };

    let request_id = match conn.expect_frame().await {
        BridgeMessage::Reply {
            request_id,
            chat_id,
            message_id,
            text,
        } => {
            assert_eq!(chat_id, "4915112345@c.us");
            assert_eq!(message_id, "3EB0C767D26A");
            assert_eq!(text, "Pong!");
            request_id
        }
        other => panic!("expected reply, got {other:?}"),
    };
    conn.push(BridgeMessage::ReplyAck {
        request_id,
        ok: true,
        error: None,
    })
    .await;

    replier.await.unwrap().expect("acked reply succeeds");
}

#[tokio::test]
async fn ack_is_not_stuck_behind_a_message_backlog() {
    let (client, mut events, mut conn) = connected(5).await;
    let backlog = SessionsConfig::default().event_buffer + 6;

    let replier = {
        let client = client.clone();
        tokio::spawn(async move { client.reply(&inbound(), "Pong!").await })
    };
    let BridgeMessage::Reply { request_id, .. } = conn.expect_frame().await else {
        panic!("expected reply frame");
    };

    // Nobody drains `events` while the reply is in flight.
    for i in 0..backlog {
        conn.push(BridgeMessage::Message {
            message: WireMessage {
                id: format!("m{i}"),
                from: "4915112345@c.us".into(),
                body: "hello".into(),
                timestamp: i as i64,
            },
        })
        .await;
    }
    conn.push(BridgeMessage::ReplyAck {
        request_id,
        ok: true,
        error: None,
    })
    .await;

    tokio::time::timeout(Duration::from_secs(2), replier)
        .await
        .expect("ack resolved while events were backed up")
        .unwrap()
        .expect("acked reply succeeds");

    for i in 0..backlog {
        match next_event(&mut events).await {
            ClientEvent::Message(m) => assert_eq!(m.id, format!("m{i}")),
            other => panic!("expected message m{i}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn rejected_reply_is_a_send_error() {
    let (client, _events, mut conn) = connected(5).await;

    let replier = {
        let client = client.clone();
        tokio::spawn(async move { client.reply(&inbound(), "Pong!").await })
    };
    let BridgeMessage::Reply { request_id, .. } = conn.expect_frame().await else {
        panic!("expected reply frame");
    };
    conn.push(BridgeMessage::ReplyAck {
        request_id,
        ok: false,
        error: Some("chat not found".into()),
    })
    .await;

    match replier.await.unwrap() {
        Err(Error::Send(reason)) => assert!(reason.contains("chat not found")),
        other => panic!("expected send error, got {other:?}"),
    }
}

#[tokio::test]
async fn unacked_reply_times_out() {
    let (client, _events, mut conn) = connected(1).await;
    let replier = {
        let client = client.clone();
        tokio::spawn(async move { client.reply(&inbound(), "Pong!").await })
    };
    let _ = conn.expect_frame().await;
    assert!(matches!(replier.await.unwrap(), Err(Error::Timeout(_))));
}

#[tokio::test]
async fn sidecar_ping_gets_pong() {
    let (_client, _events, mut conn) = connected(5).await;
    conn.push(BridgeMessage::Ping { timestamp: 42 }).await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        match tokio::time::timeout_at(deadline, conn.recv.recv()).await {
            Ok(Some(BridgeMessage::Pong { timestamp })) => {
                assert_eq!(timestamp, 42);
                break;
            }
            Ok(Some(_)) => continue,
            _ => panic!("no pong"),
        }
    }
}

#[tokio::test]
async fn socket_close_disconnects_and_fails_pending() {
    let (client, mut events, mut conn) = connected(30).await;

    let replier = {
        let client = client.clone();
        tokio::spawn(async move { client.reply(&inbound(), "Pong!").await })
    };
    let _ = conn.expect_frame().await;
    conn.hang_up().await;

    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Disconnected("bridge connection closed".into())
    );
    assert!(replier.await.unwrap().is_err());
    assert!(client.initialize().await.is_err());
}

#[tokio::test]
async fn destroy_sends_frame_once() {
    let (client, _events, mut conn) = connected(5).await;
    client.destroy().await.unwrap();
    client.destroy().await.unwrap();
    assert_eq!(conn.expect_frame().await, BridgeMessage::Destroy);
}

#[tokio::test]
async fn unreachable_sidecar_fails_construction() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = factory(addr, 5).create(profile()).await;
    assert!(matches!(result, Err(Error::Bridge(_))));
}

#[tokio::test]
async fn missing_welcome_times_out() {
    let (addr, _conns) = start_mini_sidecar(false).await;
    let result = factory(addr, 5).create(profile()).await;
    assert!(matches!(result, Err(Error::Timeout(_))));
}
