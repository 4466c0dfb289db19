use std::fmt;

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{json::JsonString, serde_as};

use crate::Result;
use crate::serde_helpers::deserialize_with_warnings;

pub const TEXT: &str = "TEXT";
pub const BUTTONS: &str = "BUTTONS";
pub const IMAGE: &str = "IMAGE";

/// A bot-originated message.
///
/// On the wire this is `{ "type": ..., "content": ... }`. Known types whose content does not
/// have the expected shape are kept as [`InboundMessage::Unknown`] rather than rejected.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMessage", into = "WireMessage")]
pub enum InboundMessage {
    Text(String),
    Buttons(ButtonsContent),
    Image(ImageContent),
    Unknown {
        message_type: String,
        content: Value,
    },
}

impl InboundMessage {
    /// The wire `type` of this message.
    #[must_use]
    pub fn message_type(&self) -> &str {
        match self {
            Self::Text(_) => TEXT,
            Self::Buttons(_) => BUTTONS,
            Self::Image(_) => IMAGE,
            Self::Unknown { message_type, .. } => message_type,
        }
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    #[must_use]
    pub fn is_buttons(&self) -> bool {
        matches!(self, Self::Buttons(_))
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_buttons(&self) -> Option<&ButtonsContent> {
        match self {
            Self::Buttons(content) => Some(content),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_image(&self) -> Option<&ImageContent> {
        match self {
            Self::Image(content) => Some(content),
            _ => None,
        }
    }
}

/// Renders the message for a plain text UI.
impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Buttons(content) => {
                let titles: Vec<&str> = content.buttons.iter().map(|b| b.title.as_str()).collect();
                write!(f, "{}\nOptions: {}", content.display_text, titles.join(", "))
            }
            Self::Image(ImageContent {
                caption: Some(caption),
                ..
            }) => write!(f, "Image: {caption}"),
            Self::Image(_) => f.write_str("Image"),
            Self::Unknown { message_type, .. } => {
                write!(f, "Unknown message type: {message_type}")
            }
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct ButtonsContent {
    /// Text shown above the buttons
    #[builder(into)]
    pub display_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub options_title: Option<String>,
    #[builder(default)]
    pub buttons: Vec<Button>,
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    /// What picking the button does, e.g. `postback` or `set_value`
    #[builder(into)]
    pub action_type: String,
    /// Slot set by `set_value` actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub slot: Option<String>,
    #[builder(into)]
    pub title: String,
    /// Value sent back when the button is picked
    #[builder(into)]
    pub payload: String,
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Builder)]
pub struct ImageContent {
    #[builder(into)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub caption: Option<String>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default)]
    content: Value,
}

impl From<RawMessage> for InboundMessage {
    fn from(raw: RawMessage) -> Self {
        let RawMessage {
            message_type,
            content,
        } = raw;

        let known = match message_type.as_str() {
            TEXT => content.as_str().map(|text| Self::Text(text.to_owned())),
            BUTTONS => serde_json::from_value(content.clone()).ok().map(Self::Buttons),
            IMAGE => serde_json::from_value(content.clone()).ok().map(Self::Image),
            _ => None,
        };

        known.unwrap_or(Self::Unknown {
            message_type,
            content,
        })
    }
}

#[derive(Serialize)]
struct WireMessage {
    #[serde(rename = "type")]
    message_type: String,
    content: WireContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Buttons(ButtonsContent),
    Image(ImageContent),
    Raw(Value),
}

impl From<InboundMessage> for WireMessage {
    fn from(message: InboundMessage) -> Self {
        let message_type = message.message_type().to_owned();
        let content = match message {
            InboundMessage::Text(text) => WireContent::Text(text),
            InboundMessage::Buttons(content) => WireContent::Buttons(content),
            InboundMessage::Image(content) => WireContent::Image(content),
            InboundMessage::Unknown { content, .. } => WireContent::Raw(content),
        };

        Self {
            message_type,
            content,
        }
    }
}

/// The decoded bot event: `{ "message": ... }`.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BotMessage {
    pub message: InboundMessage,
}

/// One `subscribeBotMessage` event; `data` arrives as a JSON encoded string.
#[serde_as]
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotMessageEvent {
    #[serde_as(as = "JsonString")]
    pub data: BotMessage,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionData {
    subscribe_bot_message: BotMessageEvent,
}

#[derive(Debug, Deserialize)]
struct DataPayload {
    data: SubscriptionData,
}

/// Body of a request channel response. Only `errors` is inspected.
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<Value>,
}

/// Decode the payload of a `data` frame into the bot message it carries.
pub fn parse_payload(payload: Value) -> Result<Vec<InboundMessage>> {
    let payload: DataPayload = deserialize_with_warnings(payload)?;
    Ok(vec![payload.data.subscribe_bot_message.data.message])
}
