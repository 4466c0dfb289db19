#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests, and https://github.com/rust-lang/rust-clippy/issues/13981"
)]
#![allow(
    unused,
    reason = "Deeply nested uses in sub-modules are falsely flagged as being unused"
)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use botcircuits_client_sdk::session::{Client, ConnectionStatus, SessionConfig};
use futures_util::{SinkExt as _, StreamExt as _};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;

pub const APP_ID: &str = "app-1";
pub const API_KEY: &str = "da2-test-key";
pub const SESSION_ID: &str = "sess-1";

/// How long to wait for something that should happen.
pub const WAIT: Duration = Duration::from_secs(2);
/// How long to wait to be confident something does not happen.
pub const QUIET: Duration = Duration::from_millis(300);

#[derive(Clone, Debug)]
enum Outgoing {
    Text(String),
    /// Send a close frame
    Close,
    /// Drop the TCP connection without a close frame
    Abort,
}

/// Mock GraphQL realtime server speaking `graphql-ws`.
///
/// In auto-ack mode `connection_init` is answered with `connection_ack` and `start` with
/// `start_ack`; in manual mode the test drives every reply.
pub struct MockWsServer {
    addr: SocketAddr,
    /// Frames pushed to ALL connected clients
    outgoing: broadcast::Sender<Outgoing>,
    /// Frames received from clients, in order
    frames: mpsc::UnboundedReceiver<Value>,
    /// Request URIs of accepted handshakes
    uris: mpsc::UnboundedReceiver<String>,
    connections: Arc<AtomicUsize>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        Self::spawn(true).await
    }

    pub async fn start_manual() -> Self {
        Self::spawn(false).await
    }

    async fn spawn(auto_ack: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (outgoing, _) = broadcast::channel::<Outgoing>(4096);
        let (frame_tx, frames) = mpsc::unbounded_channel::<Value>();
        let (uri_tx, uris) = mpsc::unbounded_channel::<String>();
        let connections = Arc::new(AtomicUsize::new(0));

        let broadcast_tx = outgoing.clone();
        let counter = Arc::clone(&connections);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };

                let uri_tx = uri_tx.clone();
                let callback = move |request: &Request, mut response: Response| {
                    drop(uri_tx.send(request.uri().to_string()));
                    response
                        .headers_mut()
                        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("graphql-ws"));
                    Ok::<Response, ErrorResponse>(response)
                };

                let Ok(ws_stream) = tokio_tungstenite::accept_hdr_async(stream, callback).await
                else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let (mut write, mut read) = ws_stream.split();
                let frame_tx = frame_tx.clone();
                let mut msg_rx = broadcast_tx.subscribe();

                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            msg = read.next() => {
                                match msg {
                                    Some(Ok(Message::Text(text))) => {
                                        let frame: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

                                        let reply = match frame["type"].as_str() {
                                            Some("connection_init") if auto_ack => Some(json!({
                                                "type": "connection_ack",
                                                "payload": { "connectionTimeoutMs": 300_000 }
                                            })),
                                            Some("start") if auto_ack => Some(json!({
                                                "type": "start_ack",
                                                "id": frame["id"]
                                            })),
                                            _ => None,
                                        };
                                        if let Some(reply) = reply
                                            && write.send(Message::Text(reply.to_string().into())).await.is_err()
                                        {
                                            break;
                                        }

                                        drop(frame_tx.send(frame));
                                    }
                                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                                    Some(Ok(_)) => {}
                                }
                            }
                            msg = msg_rx.recv() => {
                                match msg {
                                    Ok(Outgoing::Text(text)) => {
                                        if write.send(Message::Text(text.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                    Ok(Outgoing::Close) => {
                                        drop(write.send(Message::Close(None)).await);
                                    }
                                    Ok(Outgoing::Abort) | Err(_) => break,
                                }
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr,
            outgoing,
            frames,
            uris,
            connections,
        }
    }

    /// `host:port` to use as the session host.
    #[must_use]
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// Send a frame to all connected clients.
    pub fn send(&self, frame: &Value) {
        drop(self.outgoing.send(Outgoing::Text(frame.to_string())));
    }

    /// Send a raw text message to all connected clients.
    pub fn send_raw(&self, text: &str) {
        drop(self.outgoing.send(Outgoing::Text(text.to_owned())));
    }

    /// Close all connections with a close frame.
    pub fn close(&self) {
        drop(self.outgoing.send(Outgoing::Close));
    }

    /// Drop all connections without a closing handshake.
    pub fn abort(&self) {
        drop(self.outgoing.send(Outgoing::Abort));
    }

    /// Number of accepted websocket connections so far.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Next frame received from any client.
    pub async fn recv_frame(&mut self) -> Option<Value> {
        timeout(WAIT, self.frames.recv()).await.ok().flatten()
    }

    /// Skip frames until one of type `frame_type` arrives.
    pub async fn expect_frame(&mut self, frame_type: &str) -> Value {
        loop {
            let frame = self
                .recv_frame()
                .await
                .unwrap_or_else(|| panic!("no {frame_type} frame received"));
            if frame["type"] == frame_type {
                return frame;
            }
        }
    }

    /// Request URI of the next accepted handshake.
    pub async fn recv_uri(&mut self) -> Option<String> {
        timeout(WAIT, self.uris.recv()).await.ok().flatten()
    }
}

#[must_use]
pub fn config(host: &str) -> SessionConfig {
    SessionConfig::builder()
        .app_id(APP_ID)
        .api_key(API_KEY)
        .host(host)
        .use_tls(false)
        .build()
}

pub fn client(server: &MockWsServer) -> anyhow::Result<Client> {
    Ok(Client::with_session_id(config(&server.host()), SESSION_ID)?)
}

/// A `data` frame carrying `message` the way the backend encodes it.
#[must_use]
pub fn data_frame(message: &Value) -> Value {
    data_frame_raw(&json!({ "message": message }).to_string())
}

/// A `data` frame whose inner `data` string is `data`, verbatim.
#[must_use]
pub fn data_frame_raw(data: &str) -> Value {
    json!({
        "type": "data",
        "id": SESSION_ID,
        "payload": {
            "data": {
                "subscribeBotMessage": {
                    "data": data,
                    "appId": APP_ID,
                    "sessionId": SESSION_ID
                }
            }
        }
    })
}

#[must_use]
pub fn text_message(content: &str) -> Value {
    json!({ "type": "TEXT", "content": content })
}

/// Wait until the client reports `status`.
pub async fn wait_for_status(client: &Client, status: ConnectionStatus) -> anyhow::Result<()> {
    let mut rx = client.status_receiver();
    timeout(WAIT, rx.wait_for(|current| *current == status)).await??;
    Ok(())
}
