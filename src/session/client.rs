use std::sync::Arc;

use async_stream::{stream, try_stream};
use futures::Stream;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use url::Url;

use super::config::SessionConfig;
use super::subscription::{BotMessageParser, SUBSCRIBE_DOCUMENT, SubscribeVariables};
use super::types::request::{Envelope, OutboundRequest, PUBLISH_DOCUMENT, PublishVariables};
use super::types::response::{GraphqlResponse, InboundMessage};
use crate::auth::{Authorization, EMPTY_PAYLOAD};
use crate::error::Error;
use crate::ws::{
    ClientFrame, ConnectionManager, ConnectionStatus, Operation, SubscriptionHandle, WsError,
    client_request,
};
use crate::{Result, USER_AGENT, generate_session_id};

/// Client for one chat session with a BotCircuits bot.
///
/// Bot messages arrive over a realtime subscription started with
/// [`Client::start_subscription`]; user messages go out one request at a time with
/// [`Client::send_message`]. Cloning is cheap and clones share the session.
///
/// Concurrent [`Client::send_message`] calls are independent requests; the order in which the
/// backend receives them is not guaranteed.
///
/// # Example
///
/// ```rust, no_run
/// use botcircuits_client_sdk::session::{Client, OutboundRequest, SessionConfig};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = SessionConfig::builder()
///         .app_id("my-app")
///         .api_key("da2-xxxxxxxx")
///         .build();
///     let client = Client::new(config)?;
///
///     client
///         .start_subscription(|message| println!("bot: {message}"))
///         .await?;
///     client.send_message(&OutboundRequest::text("Hello")).await?;
///
///     client.close().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: SessionConfig,
    session_id: String,
    authorization: Authorization,
    /// Request channel endpoint
    graphql_endpoint: Url,
    /// Realtime connect URL, including the `header` and `payload` query parameters
    realtime_endpoint: Url,
    client: reqwest::Client,
    connection: ConnectionManager<InboundMessage, BotMessageParser>,
    /// Unsubscribe handle of the running subscription
    subscription: Mutex<Option<SubscriptionHandle>>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(handle) = self.subscription.get_mut().take() {
            handle.cancel();
        }
    }
}

impl Client {
    /// Create a client for a new session with a generated id.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_session_id(config, generate_session_id())
    }

    /// Create a client resuming the session `session_id`.
    pub fn with_session_id<S: Into<String>>(config: SessionConfig, session_id: S) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(Error::validation("host must not be empty"));
        }

        let authorization = Authorization::new(config.api_key.clone(), config.host.clone());

        let graphql_endpoint = parse_endpoint(&format!(
            "{}://{}/graphql",
            config.http_scheme(),
            config.host
        ))?;
        let realtime_endpoint = parse_endpoint(&format!(
            "{}://{}/graphql/realtime?header={}&payload={EMPTY_PAYLOAD}",
            config.ws_scheme(),
            config.host,
            authorization.header_blob()?
        ))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        let connection = ConnectionManager::new(config.realtime.clone(), BotMessageParser);

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                session_id: session_id.into(),
                authorization,
                graphql_endpoint,
                realtime_endpoint,
                client,
                connection,
                subscription: Mutex::new(None),
            }),
        })
    }

    /// Start receiving bot messages for this session.
    ///
    /// `on_message` is called once per decoded message, in arrival order. Returns once the
    /// connection has been dispatched; watch [`Client::connection_status`] (or
    /// [`Client::status_changes`]) to learn when it is live.
    ///
    /// Calling this while a subscription is running does nothing. Once a subscription has
    /// ended on its own (error or server close) calling it again opens a fresh connection.
    ///
    /// Failures after dispatch are not returned: they are logged and move the status to
    /// [`ConnectionStatus::Error`]. Undecodable messages are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`Kind::Handshake`](crate::error::Kind::Handshake) error when the connection
    /// request cannot be built.
    pub async fn start_subscription<F>(&self, on_message: F) -> Result<()>
    where
        F: Fn(InboundMessage) + Send + Sync + 'static,
    {
        let mut subscription = self.inner.subscription.lock().await;

        if subscription
            .as_ref()
            .is_some_and(SubscriptionHandle::is_active)
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(session_id = %self.inner.session_id, "Subscription already active");
            return Ok(());
        }
        if let Some(finished) = subscription.take() {
            finished.cancel();
        }

        self.inner.connection.set_status(ConnectionStatus::Connecting);

        let (request, start) = match self.prepare_connection() {
            Ok(prepared) => prepared,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Unable to build realtime connection request: {e}");
                self.inner.connection.set_status(ConnectionStatus::Error);
                return Err(e);
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            session_id = %self.inner.session_id,
            host = %self.inner.config.host,
            "Starting subscription"
        );

        *subscription = Some(
            self.inner
                .connection
                .connect(request, start, Arc::new(on_message)),
        );

        Ok(())
    }

    fn prepare_connection(&self) -> Result<(Request, ClientFrame)> {
        let request = client_request(self.inner.realtime_endpoint.as_str())?;

        let operation = Operation::new(
            SUBSCRIBE_DOCUMENT,
            SubscribeVariables::new(&self.inner.config.app_id, &self.inner.session_id),
        );
        let start = ClientFrame::start(
            self.inner.session_id.clone(),
            &operation,
            self.inner.authorization.extension()?,
        )?;

        Ok((request, start))
    }

    /// Stop the running subscription, if any.
    ///
    /// No message is delivered once this returns, even if frames were already in flight.
    pub async fn stop_subscription(&self) {
        let handle = self.inner.subscription.lock().await.take();

        if let Some(handle) = handle {
            handle.cancel();
            self.inner
                .connection
                .set_status(ConnectionStatus::Disconnected);

            #[cfg(feature = "tracing")]
            tracing::debug!(session_id = %self.inner.session_id, "Subscription stopped");
        }
    }

    /// Stop the subscription and leave the client [`ConnectionStatus::Disconnected`].
    ///
    /// Safe to call repeatedly, and before any subscription was started. Messages already
    /// being sent are not cancelled.
    pub async fn close(&self) {
        self.stop_subscription().await;
        self.inner
            .connection
            .set_status(ConnectionStatus::Disconnected);
    }

    /// Send a user message to the bot.
    ///
    /// GraphQL errors reported in a successful response are logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns a [`Kind::Status`](crate::error::Kind::Status) error for a non-2xx response
    /// (carrying the status code and response body) and a
    /// [`Kind::Transport`](crate::error::Kind::Transport) error when the request could not be
    /// made.
    pub async fn send_message(&self, request: &OutboundRequest) -> Result<()> {
        let envelope = Envelope::new(&self.inner.config.app_id, &self.inner.session_id, request);
        let operation = Operation::new(PUBLISH_DOCUMENT, PublishVariables::new(envelope));

        let http_request = self
            .inner
            .client
            .post(self.inner.graphql_endpoint.clone())
            .json(&operation)
            .build()?;
        let headers = self.inner.authorization.headers()?;

        let response: Option<GraphqlResponse> =
            crate::request(&self.inner.client, http_request, Some(headers)).await?;

        if let Some(response) = response
            && !response.errors.is_empty()
        {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                session_id = %self.inner.session_id,
                errors = %WsError::describe(&response.errors),
                "Backend reported errors for sent message"
            );
        }

        Ok(())
    }

    /// Current status of the realtime channel.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.connection.status()
    }

    /// Receiver notified on every status change.
    #[must_use]
    pub fn status_receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.connection.status_receiver()
    }

    /// Stream of statuses, starting with the current one.
    ///
    /// Intermediate values may be skipped when the status changes faster than it is polled.
    pub fn status_changes(&self) -> impl Stream<Item = ConnectionStatus> {
        let mut rx = self.status_receiver();

        stream! {
            loop {
                let status = *rx.borrow_and_update();
                yield status;

                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    /// Stream of decoded bot messages, in addition to the subscription callback.
    ///
    /// Only messages delivered after this call are seen. A consumer that falls behind gets a
    /// [`WsError::Lagged`] error and then continues with newer messages.
    pub fn messages(&self) -> impl Stream<Item = Result<InboundMessage>> {
        let mut rx = self.inner.connection.subscribe();

        try_stream! {
            loop {
                match rx.recv().await {
                    Ok(message) => yield message,
                    Err(RecvError::Lagged(n)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Message stream lagged, missed {n} messages");
                        Err(WsError::Lagged { count: n })?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.inner.config.app_id
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Whether a subscription is running.
    pub async fn is_subscribed(&self) -> bool {
        self.inner
            .subscription
            .lock()
            .await
            .as_ref()
            .is_some_and(SubscriptionHandle::is_active)
    }

    /// The realtime connect URL. Carries the API key in its `header` parameter.
    #[must_use]
    pub fn realtime_endpoint(&self) -> &Url {
        &self.inner.realtime_endpoint
    }

    #[must_use]
    pub fn graphql_endpoint(&self) -> &Url {
        &self.inner.graphql_endpoint
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    Ok(Url::parse(endpoint)?)
}
