use serde::Serialize;
use serde_json::Value;

use super::types::response::{InboundMessage, parse_payload};
use crate::Result;
use crate::ws::MessageParser;

/// Subscription delivering the bot's messages for one session.
pub const SUBSCRIBE_DOCUMENT: &str = "subscription Subscribe($appId: String!, $sessionId: String!) { subscribeBotMessage(appId: $appId, sessionId: $sessionId) { data appId sessionId } }";

/// Variables of [`SUBSCRIBE_DOCUMENT`].
#[non_exhaustive]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeVariables<'req> {
    pub app_id: &'req str,
    pub session_id: &'req str,
}

impl<'req> SubscribeVariables<'req> {
    #[must_use]
    pub fn new(app_id: &'req str, session_id: &'req str) -> Self {
        Self { app_id, session_id }
    }
}

/// Parses `subscribeBotMessage` data frames.
#[non_exhaustive]
#[derive(Clone, Debug, Default)]
pub struct BotMessageParser;

impl MessageParser<InboundMessage> for BotMessageParser {
    fn parse(&self, payload: Value) -> Result<Vec<InboundMessage>> {
        parse_payload(payload)
    }
}
