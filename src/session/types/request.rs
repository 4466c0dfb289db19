use bon::Builder;
use serde::Serialize;
use serde_json::Value;
use serde_with::{json::JsonString, serde_as};

use super::response::Button;
use crate::types::Attributes;

/// Attribute set when the user picks a button.
pub const SELECTED_BUTTON: &str = "selected_button";

/// Mutation delivering a user message to the bot.
pub const PUBLISH_DOCUMENT: &str = "mutation Publish($data: AWSJSON!, $appId: String!, $sessionId: String!) { sendUserMessage(data: $data, appId: $appId, sessionId: $sessionId) { data appId sessionId } }";

/// A user-originated message: free text, a button payload, or either with extra metadata.
///
/// No combination of fields is rejected; an empty request is sent as-is.
///
/// # Example
///
/// ```
/// use botcircuits_client_sdk::session::OutboundRequest;
///
/// let request = OutboundRequest::text("Hello").with_attribute("locale", "en");
/// assert_eq!(request.text_message.as_deref(), Some("Hello"));
/// ```
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Builder)]
pub struct OutboundRequest {
    #[builder(into)]
    pub text_message: Option<String>,
    pub request_attributes: Option<Attributes>,
}

impl OutboundRequest {
    /// A plain text message.
    #[must_use]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text_message: Some(text.into()),
            request_attributes: None,
        }
    }

    /// The message sent when the user picks `button`: its payload as text, also recorded as
    /// the `selected_button` attribute.
    #[must_use]
    pub fn button(button: &Button) -> Self {
        Self::text(button.payload.clone()).with_attribute(SELECTED_BUTTON, button.payload.clone())
    }

    /// Add (or replace) a request attribute.
    #[must_use]
    pub fn with_attribute<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.request_attributes
            .get_or_insert_with(Attributes::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Envelope action understood by the bot runtime.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Executor,
}

/// Application payload carried, JSON encoded, in the `data` variable of the publish mutation.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<'req> {
    pub action: Action,
    pub app_id: &'req str,
    pub session_id: &'req str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_text: Option<&'req str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_attributes: Option<&'req Attributes>,
}

impl<'req> Envelope<'req> {
    #[must_use]
    pub fn new(app_id: &'req str, session_id: &'req str, request: &'req OutboundRequest) -> Self {
        Self {
            action: Action::Executor,
            app_id,
            session_id,
            input_text: request.text_message.as_deref(),
            request_attributes: request.request_attributes.as_ref(),
        }
    }
}

/// Variables of [`PUBLISH_DOCUMENT`].
#[serde_as]
#[non_exhaustive]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishVariables<'req> {
    #[serde_as(as = "JsonString")]
    pub data: Envelope<'req>,
    pub app_id: &'req str,
    pub session_id: &'req str,
}

impl<'req> PublishVariables<'req> {
    #[must_use]
    pub fn new(envelope: Envelope<'req>) -> Self {
        Self {
            app_id: envelope.app_id,
            session_id: envelope.session_id,
            data: envelope,
        }
    }
}
