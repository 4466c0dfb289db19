#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod auth;
pub mod error;
pub(crate) mod serde_helpers;
pub mod session;
pub mod types;
pub mod ws;

use reqwest::{Request, header::HeaderMap};
use serde::de::DeserializeOwned;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Default backend host serving both the realtime and the request channel.
pub const DEFAULT_HOST: &str = "pubsub.botcircuits.com";

/// Client identifier sent as `x-amz-user-agent` and `User-Agent`.
pub const USER_AGENT: &str = concat!("botcircuits-client-sdk/", env!("CARGO_PKG_VERSION"));

/// Generate a fresh session identifier (random UUID v4).
#[must_use]
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Execute `request` and decode its JSON body.
///
/// Non-2xx responses become [`error::Kind::Status`] errors carrying the response body. A
/// successful response with an empty or undecodable body yields `Ok(None)`.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "debug",
        skip(client, request, headers),
        fields(
            method = %request.method(),
            path = request.url().path(),
            status_code
        )
    )
)]
async fn request<Response: DeserializeOwned>(
    client: &reqwest::Client,
    mut request: Request,
    headers: Option<HeaderMap>,
) -> Result<Option<Response>> {
    let method = request.method().clone();
    let path = request.url().path().to_owned();

    if let Some(h) = headers {
        request.headers_mut().extend(h);
    }

    let response = client.execute(request).await?;
    let status_code = response.status();

    #[cfg(feature = "tracing")]
    tracing::Span::current().record("status_code", status_code.as_u16());

    if !status_code.is_success() {
        let message = response.text().await.unwrap_or_default();

        #[cfg(feature = "tracing")]
        tracing::warn!(
            status = %status_code,
            method = %method,
            path = %path,
            message = %message,
            "API request failed"
        );

        return Err(Error::status(status_code, method, path, message));
    }

    let body = response.bytes().await?;
    if body.is_empty() {
        return Ok(None);
    }

    let json_value = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => value,
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(method = %method, path = %path, error = %e, "Response body is not JSON");
            #[cfg(not(feature = "tracing"))]
            let _: &serde_json::Error = &e;
            return Ok(None);
        }
    };

    match serde_helpers::deserialize_with_warnings(json_value) {
        Ok(response) => Ok(Some(response)),
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(method = %method, path = %path, error = %e, "Unexpected response body");
            #[cfg(not(feature = "tracing"))]
            let _: &Error = &e;
            Ok(None)
        }
    }
}
