//! API key handling for both session channels.
//!
//! The same key is presented three ways: as the `Authorization` header on the
//! request channel, inside the base64 `header` query parameter of the realtime
//! connect URL, and again inside the `extensions.authorization` object of the
//! subscription `start` frame.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{HeaderMap, HeaderValue};
/// Secret string types that redact values in debug output for security.
pub use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;

use crate::{Result, USER_AGENT};

pub const AUTHORIZATION: &str = "Authorization";
pub const AMZ_USER_AGENT: &str = "x-amz-user-agent";

/// Base64 of `{}`, the empty connect payload.
pub const EMPTY_PAYLOAD: &str = "e30=";

#[derive(Serialize)]
struct HeaderBlob<'a> {
    #[serde(rename = "Authorization")]
    authorization: &'a str,
    host: &'a str,
}

#[derive(Serialize)]
struct AuthorizationExtension<'a> {
    #[serde(rename = "Authorization")]
    authorization: &'a str,
    host: &'a str,
    #[serde(rename = "x-amz-user-agent")]
    user_agent: &'a str,
}

/// API key bound to the backend host it authorizes.
#[derive(Clone, Debug)]
pub struct Authorization {
    api_key: SecretString,
    host: String,
}

impl Authorization {
    #[must_use]
    pub fn new(api_key: SecretString, host: String) -> Self {
        Self { api_key, host }
    }

    #[must_use]
    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Base64 encoded `{"Authorization": <key>, "host": <host>}` for the connect URL.
    pub fn header_blob(&self) -> Result<String> {
        let json = serde_json::to_vec(&HeaderBlob {
            authorization: self.api_key.expose_secret(),
            host: &self.host,
        })?;

        Ok(STANDARD.encode(json))
    }

    /// The `authorization` object carried in the `start` frame extensions.
    ///
    /// # Security
    ///
    /// The returned value holds the API key in plaintext. It is only ever written to the
    /// realtime socket and must not be logged.
    pub fn extension(&self) -> Result<Value> {
        Ok(serde_json::to_value(AuthorizationExtension {
            authorization: self.api_key.expose_secret(),
            host: &self.host,
            user_agent: USER_AGENT,
        })?)
    }

    /// Headers for the request channel.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut value = HeaderValue::from_str(self.api_key.expose_secret())?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn authorization() -> Authorization {
        Authorization::new(
            SecretString::from("da2-test-key"),
            "pubsub.botcircuits.com".to_owned(),
        )
    }

    #[test]
    fn header_blob_should_decode_to_key_and_host() {
        let blob = authorization().header_blob().unwrap();
        let decoded = STANDARD.decode(blob).unwrap();

        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            r#"{"Authorization":"da2-test-key","host":"pubsub.botcircuits.com"}"#
        );
    }

    #[test]
    fn empty_payload_is_base64_of_empty_object() {
        assert_eq!(STANDARD.decode(EMPTY_PAYLOAD).unwrap(), b"{}");
    }

    #[test]
    fn extension_should_carry_user_agent() {
        let extension = authorization().extension().unwrap();

        assert_eq!(
            extension,
            json!({
                "Authorization": "da2-test-key",
                "host": "pubsub.botcircuits.com",
                "x-amz-user-agent": USER_AGENT,
            })
        );
    }

    #[test]
    fn headers_should_mark_key_sensitive() {
        let headers = authorization().headers().unwrap();
        let value = headers.get(AUTHORIZATION).unwrap();

        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "da2-test-key");
    }

    #[test]
    fn debug_should_redact_key() {
        let debug = format!("{:?}", authorization());

        assert!(!debug.contains("da2-test-key"), "key leaked: {debug}");
    }

    #[test]
    fn headers_reject_control_characters() {
        let auth = Authorization::new(SecretString::from("bad\nkey"), "h".to_owned());

        auth.headers().unwrap_err();
    }
}
