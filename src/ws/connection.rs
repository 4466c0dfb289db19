#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_tungstenite::tungstenite::client::IntoClientRequest as _;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use super::config::Config;
use super::error::WsError;
use super::frame::{ClientFrame, SUBPROTOCOL, ServerFrame};
use super::traits::MessageParser;
use crate::{Result, error::Error};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Broadcast channel capacity for incoming messages.
const BROADCAST_CAPACITY: usize = 1024;

/// Callback invoked for every decoded inbound message, in arrival order.
pub type MessageCallback<M> = Arc<dyn Fn(M) + Send + Sync + 'static>;

/// The client's current view of realtime channel health.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    /// No subscription is running
    #[default]
    Disconnected,
    /// Transport is being opened or the subscription is not yet acknowledged
    Connecting,
    /// Subscription acknowledged (or first data received)
    Connected,
    /// The connection attempt failed; not recovered automatically
    Error,
}

impl ConnectionStatus {
    /// Check if the subscription is currently live.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Build the websocket request for `endpoint`, negotiating the `graphql-ws` subprotocol.
///
/// Failures here are handshake errors: nothing has been sent yet.
pub fn client_request(endpoint: &str) -> Result<Request> {
    let mut request = endpoint
        .into_client_request()
        .map_err(|e| Error::handshake(WsError::Connection(e)))?;
    request
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));

    Ok(request)
}

/// Unsubscribe handle for one running connection.
#[derive(Debug)]
pub struct SubscriptionHandle {
    token: CancellationToken,
    /// Set by the task before it publishes its final status
    ended: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Whether the connection is still running and has not been cancelled.
    ///
    /// A connection reads as inactive before its final status (`Error` or `Disconnected`)
    /// becomes observable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
            && !self.ended.load(Ordering::Acquire)
            && !self.task.is_finished()
    }

    /// Stop delivering messages and tear the connection down.
    ///
    /// Returns immediately; the connection task sends `stop` and closes the socket on its own.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Runs realtime connections and publishes their status and messages.
///
/// Each call to [`ConnectionManager::connect`] spawns exactly one connection. There is no
/// reconnection: when the connection ends, its task ends. Status and the message broadcast
/// outlive individual connections so observers can stay subscribed across restarts.
///
/// # Type Parameters
///
/// - `M`: Message type produced by the parser
/// - `P`: Parser type that implements [`MessageParser<M>`]
pub struct ConnectionManager<M, P>
where
    M: Debug + Clone + Send + Sync + 'static,
    P: MessageParser<M>,
{
    config: Config,
    parser: Arc<P>,
    /// Watch channel sender for status changes
    state_tx: watch::Sender<ConnectionStatus>,
    /// Broadcast sender for incoming messages
    broadcast_tx: broadcast::Sender<M>,
}

impl<M, P> ConnectionManager<M, P>
where
    M: Debug + Clone + Send + Sync + 'static,
    P: MessageParser<M>,
{
    #[must_use]
    pub fn new(config: Config, parser: P) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (state_tx, _) = watch::channel(ConnectionStatus::Disconnected);

        Self {
            config,
            parser: Arc::new(parser),
            state_tx,
            broadcast_tx,
        }
    }

    /// Spawn a connection that sends `start` once the server acknowledges `connection_init`.
    pub fn connect(
        &self,
        request: Request,
        start: ClientFrame,
        on_message: MessageCallback<M>,
    ) -> SubscriptionHandle {
        let token = CancellationToken::new();
        let ended = Arc::new(AtomicBool::new(false));
        let task = ConnectionTask {
            config: self.config.clone(),
            parser: Arc::clone(&self.parser),
            state_tx: self.state_tx.clone(),
            broadcast_tx: self.broadcast_tx.clone(),
            on_message,
            start,
            token: token.clone(),
            ended: Arc::clone(&ended),
        };

        SubscriptionHandle {
            token,
            ended,
            task: tokio::spawn(task.run(request)),
        }
    }

    /// Set the status from the owning client.
    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        self.state_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    /// Get the current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.state_tx.borrow()
    }

    /// Subscribe to status changes.
    #[must_use]
    pub fn status_receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.state_tx.subscribe()
    }

    /// Subscribe to incoming messages.
    ///
    /// Each call returns a new independent receiver.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<M> {
        self.broadcast_tx.subscribe()
    }
}

enum Flow {
    Continue,
    Complete,
}

struct ConnectionTask<M, P> {
    config: Config,
    parser: Arc<P>,
    state_tx: watch::Sender<ConnectionStatus>,
    broadcast_tx: broadcast::Sender<M>,
    on_message: MessageCallback<M>,
    start: ClientFrame,
    token: CancellationToken,
    ended: Arc<AtomicBool>,
}

impl<M, P> ConnectionTask<M, P>
where
    M: Debug + Clone + Send + Sync + 'static,
    P: MessageParser<M>,
{
    async fn run(self, request: Request) {
        let ws_stream = tokio::select! {
            biased;

            () = self.token.cancelled() => return,
            result = connect_async(request) => match result {
                Ok((ws_stream, _)) => ws_stream,
                Err(e) => {
                    let error = Error::from(e);
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Unable to connect: {error:?}");
                    #[cfg(not(feature = "tracing"))]
                    let _: &Error = &error;
                    self.finish(ConnectionStatus::Error);
                    return;
                }
            }
        };

        let (mut write, mut read) = ws_stream.split();
        let result = self.handle_connection(&mut write, &mut read).await;
        // The peer may already be gone
        _ = write.close().await;

        match result {
            Ok(()) => self.finish(ConnectionStatus::Disconnected),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Subscription error: {e}");
                #[cfg(not(feature = "tracing"))]
                let _: &Error = &e;
                self.finish(ConnectionStatus::Error);
            }
        }
    }

    /// Drive an open connection until it closes, fails, completes or is cancelled.
    ///
    /// `Ok` means the connection ended cleanly.
    async fn handle_connection(
        &self,
        write: &mut WsSink,
        read: &mut SplitStream<WsStream>,
    ) -> Result<()> {
        send(write, &ClientFrame::ConnectionInit).await?;

        // Set once `connection_ack` arrives
        let mut keepalive: Option<Duration> = None;
        let deadline = sleep(self.config.connection_ack_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                () = self.token.cancelled() => {
                    if keepalive.is_some()
                        && let Some(stop) = self.start.stop_for()
                    {
                        _ = send(write, &stop).await;
                    }
                    return Ok(());
                }

                () = &mut deadline => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(acknowledged = keepalive.is_some(), "Realtime connection timed out");
                    return Err(WsError::Timeout.into());
                }

                frame = read.next() => {
                    let Some(frame) = frame else {
                        return Ok(());
                    };

                    match frame {
                        Ok(Message::Text(text)) => {
                            #[cfg(feature = "tracing")]
                            tracing::trace!(%text, "Received WebSocket text message");

                            if let Flow::Complete = self.handle_frame(text.as_str(), write, &mut keepalive).await? {
                                return Ok(());
                            }
                            if let Some(window) = keepalive {
                                deadline.as_mut().reset(Instant::now() + window);
                            }
                        }
                        Ok(Message::Close(_)) => return Ok(()),
                        Ok(_) => {
                            // Ping/pong is answered by tungstenite; binary frames are not part of the protocol.
                        }
                        Err(e) => return Err(WsError::Connection(e).into()),
                    }
                }
            }
        }
    }

    async fn handle_frame(
        &self,
        text: &str,
        write: &mut WsSink,
        keepalive: &mut Option<Duration>,
    ) -> Result<Flow> {
        let frame: ServerFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                let error = WsError::MessageParse(e);
                #[cfg(feature = "tracing")]
                tracing::warn!(%text, %error, "Skipping WebSocket frame");
                #[cfg(not(feature = "tracing"))]
                let _: &WsError = &error;
                return Ok(Flow::Continue);
            }
        };

        match frame {
            ServerFrame::ConnectionAck { payload } => {
                if keepalive.is_some() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Ignoring repeated connection_ack");
                    return Ok(Flow::Continue);
                }

                let window = payload
                    .and_then(|p| p.connection_timeout_ms)
                    .map_or(self.config.keepalive_timeout, Duration::from_millis);
                *keepalive = Some(window);

                #[cfg(feature = "tracing")]
                tracing::debug!(?window, "Connection acknowledged, starting subscription");
                send(write, &self.start).await?;
            }
            ServerFrame::Ka => {
                #[cfg(feature = "tracing")]
                tracing::trace!("Keep-alive");
            }
            ServerFrame::StartAck { .. } => self.publish(ConnectionStatus::Connected),
            ServerFrame::Data { payload, .. } => {
                self.publish(ConnectionStatus::Connected);

                match self.parser.parse(payload) {
                    Ok(messages) => {
                        for message in messages {
                            self.deliver(message);
                        }
                    }
                    Err(e) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %e, "Dropping undecodable data frame");
                        #[cfg(not(feature = "tracing"))]
                        let _: &Error = &e;
                    }
                }
            }
            ServerFrame::Error { payload, .. } => {
                return Err(WsError::SubscriptionFailed(WsError::describe(&payload.errors)).into());
            }
            ServerFrame::ConnectionError { payload } => {
                return Err(WsError::ConnectionError {
                    errors: payload.errors,
                }
                .into());
            }
            ServerFrame::Complete { .. } => return Ok(Flow::Complete),
            _ => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%text, "Ignoring unknown frame type");
            }
        }

        Ok(Flow::Continue)
    }

    /// Mark the connection ended, then publish its final status.
    fn finish(&self, status: ConnectionStatus) {
        self.ended.store(true, Ordering::Release);
        self.publish(status);
    }

    /// Publish a status change unless this connection has been cancelled.
    fn publish(&self, status: ConnectionStatus) {
        let token = &self.token;
        self.state_tx.send_if_modified(|current| {
            if token.is_cancelled() || *current == status {
                return false;
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(from = %current, to = %status, "Connection status changed");
            *current = status;
            true
        });
    }

    fn deliver(&self, message: M) {
        if self.token.is_cancelled() {
            #[cfg(feature = "tracing")]
            tracing::trace!(?message, "Dropping message received after unsubscribe");
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(?message, "Parsed inbound message");
        _ = self.broadcast_tx.send(message.clone());
        (self.on_message)(message);
    }
}

async fn send(write: &mut WsSink, frame: &ClientFrame) -> Result<()> {
    let json = serde_json::to_string(frame)?;
    write.send(Message::Text(json.into())).await?;
    Ok(())
}
