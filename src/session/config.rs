#![expect(
    clippy::module_name_repetitions,
    reason = "SessionConfig names the session it configures"
)]

use bon::Builder;
use secrecy::SecretString;

use crate::DEFAULT_HOST;
use crate::ws::Config;

/// Settings for one chat session client.
///
/// # Example
///
/// ```
/// use botcircuits_client_sdk::session::SessionConfig;
///
/// let config = SessionConfig::builder()
///     .app_id("my-app")
///     .api_key("da2-xxxxxxxx")
///     .build();
///
/// assert_eq!(config.host, "pubsub.botcircuits.com");
/// ```
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct SessionConfig {
    /// Application whose bot the session talks to
    #[builder(into)]
    pub app_id: String,
    /// Key presented on both channels; redacted in `Debug` output
    #[builder(into)]
    pub api_key: SecretString,
    /// Backend host, without scheme
    #[builder(into, default = DEFAULT_HOST.to_owned())]
    pub host: String,
    /// `https`/`wss` when set, otherwise `http`/`ws`
    #[builder(default = true)]
    pub use_tls: bool,
    #[builder(default)]
    pub realtime: Config,
}

impl SessionConfig {
    pub(crate) fn http_scheme(&self) -> &'static str {
        if self.use_tls { "https" } else { "http" }
    }

    pub(crate) fn ws_scheme(&self) -> &'static str {
        if self.use_tls { "wss" } else { "ws" }
    }
}
