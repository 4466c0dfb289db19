//! Control and data frames of the GraphQL realtime subprotocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subprotocol negotiated on connect.
pub const SUBPROTOCOL: &str = "graphql-ws";

/// A GraphQL document together with its variables.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation<V = Value> {
    pub query: String,
    pub variables: V,
}

impl<V> Operation<V> {
    #[must_use]
    pub fn new(query: &str, variables: V) -> Self {
        Self {
            query: query.to_owned(),
            variables,
        }
    }
}

/// Frames sent by the client.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    ConnectionInit,
    Start { id: String, payload: StartPayload },
    Stop { id: String },
}

impl ClientFrame {
    /// Build a `start` frame for `operation`, re-asserting authorization inside the payload.
    pub fn start<V: Serialize>(
        id: String,
        operation: &Operation<V>,
        authorization: Value,
    ) -> crate::Result<Self> {
        Ok(Self::Start {
            id,
            payload: StartPayload {
                data: serde_json::to_string(operation)?,
                extensions: Extensions { authorization },
            },
        })
    }

    /// Build the `stop` frame matching a `start` frame.
    #[must_use]
    pub fn stop_for(&self) -> Option<Self> {
        match self {
            Self::Start { id, .. } => Some(Self::Stop { id: id.clone() }),
            _ => None,
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartPayload {
    /// JSON encoded [`Operation`]
    pub data: String,
    pub extensions: Extensions,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extensions {
    pub authorization: Value,
}

/// Frames sent by the server.
///
/// Frame types this client does not know about are tolerated as [`ServerFrame::Unknown`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    ConnectionAck {
        #[serde(default)]
        payload: Option<AckPayload>,
    },
    /// Keep-alive
    Ka,
    StartAck {
        #[serde(default)]
        id: Option<String>,
    },
    Data {
        #[serde(default)]
        id: Option<String>,
        payload: Value,
    },
    Error {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        payload: ErrorPayload,
    },
    ConnectionError {
        #[serde(default)]
        payload: ErrorPayload,
    },
    Complete {
        #[serde(default)]
        id: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AckPayload {
    #[serde(rename = "connectionTimeoutMs", default)]
    pub connection_timeout_ms: Option<u64>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub errors: Vec<Value>,
}
