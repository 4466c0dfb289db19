#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;

use crate::error::Kind;

/// Realtime channel error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum WsError {
    /// Error connecting to or communicating with the WebSocket server
    Connection(tokio_tungstenite::tungstenite::Error),
    /// Error parsing a WebSocket frame
    MessageParse(serde_json::Error),
    /// The server rejected the connection with a `connection_error` frame
    ConnectionError {
        /// Errors reported by the server
        errors: Vec<Value>,
    },
    /// The server rejected the subscription with an `error` frame
    SubscriptionFailed(String),
    /// No acknowledgment or keep-alive arrived in time
    Timeout,
    /// Subscription stream lagged and missed messages
    Lagged {
        /// Number of messages that were missed
        count: u64,
    },
}

impl WsError {
    /// Summarize a list of GraphQL errors by their `message` fields.
    pub(crate) fn describe(errors: &[Value]) -> String {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect();

        if messages.is_empty() {
            Value::Array(errors.to_vec()).to_string()
        } else {
            messages.join("; ")
        }
    }
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "WebSocket connection error: {e}"),
            Self::MessageParse(e) => write!(f, "Failed to parse WebSocket message: {e}"),
            Self::ConnectionError { errors } => {
                write!(f, "Connection rejected: {}", Self::describe(errors))
            }
            Self::SubscriptionFailed(reason) => write!(f, "Subscription failed: {reason}"),
            Self::Timeout => write!(f, "WebSocket operation timed out"),
            Self::Lagged { count } => write!(f, "Subscription lagged, missed {count} messages"),
        }
    }
}

impl StdError for WsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            Self::MessageParse(e) => Some(e),
            _ => None,
        }
    }
}

// Integration with main Error type
impl From<WsError> for crate::error::Error {
    fn from(e: WsError) -> Self {
        let kind = match e {
            WsError::MessageParse(_) => Kind::Decode,
            _ => Kind::Subscription,
        };
        crate::error::Error::with_source(kind, e)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for crate::error::Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        crate::error::Error::with_source(Kind::Subscription, WsError::Connection(e))
    }
}
