//! Core traits for the generic realtime infrastructure.

use serde_json::Value;

/// Converts the payload of a `data` frame into messages.
///
/// # Example
///
/// ```ignore
/// pub struct EchoParser;
///
/// impl MessageParser<Value> for EchoParser {
///     fn parse(&self, payload: Value) -> crate::Result<Vec<Value>> {
///         Ok(vec![payload])
///     }
/// }
/// ```
pub trait MessageParser<M>: Send + Sync + 'static {
    /// Parse a `data` frame payload.
    ///
    /// May return an empty vec when the payload carries nothing for the subscriber. An error
    /// drops the frame; it never ends the connection.
    fn parse(&self, payload: Value) -> crate::Result<Vec<M>>;
}
