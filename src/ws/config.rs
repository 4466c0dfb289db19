#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use bon::Builder;

const DEFAULT_CONNECTION_ACK_TIMEOUT_DURATION: Duration = Duration::from_secs(15);
const DEFAULT_KEEPALIVE_TIMEOUT_DURATION: Duration = Duration::from_secs(300);

/// Configuration for the realtime connection.
///
/// There is no reconnection policy: a connection that fails or times out ends in
/// [`ConnectionStatus::Error`](super::ConnectionStatus::Error) and stays there until the
/// subscription is started again.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Maximum time to wait for `connection_ack` after sending `connection_init`
    #[builder(default = DEFAULT_CONNECTION_ACK_TIMEOUT_DURATION)]
    pub connection_ack_timeout: Duration,
    /// Maximum silence (no frame, including `ka`) tolerated once acknowledged.
    ///
    /// Replaced by `connectionTimeoutMs` when the server advertises one in `connection_ack`.
    #[builder(default = DEFAULT_KEEPALIVE_TIMEOUT_DURATION)]
    pub keepalive_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}
