#![expect(
    clippy::module_name_repetitions,
    reason = "Re-exported names intentionally match their modules for API clarity"
)]

//! Chat session client for BotCircuits bots.
//!
//! A session has two channels:
//!
//! - **Realtime inbound channel**: a GraphQL subscription over websocket on which the bot's
//!   messages arrive, decoded into [`InboundMessage`]
//! - **Request channel**: a GraphQL mutation over HTTP carrying the user's messages
//!   ([`OutboundRequest`])
//!
//! # Example
//!
//! ```rust, no_run
//! use botcircuits_client_sdk::session::{Client, InboundMessage, OutboundRequest, SessionConfig};
//! use futures::StreamExt as _;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::new(
//!         SessionConfig::builder()
//!             .app_id("my-app")
//!             .api_key("da2-xxxxxxxx")
//!             .build(),
//!     )?;
//!
//!     let mut statuses = Box::pin(client.status_changes());
//!     client.start_subscription(|message: InboundMessage| println!("{message}")).await?;
//!
//!     while let Some(status) = statuses.next().await {
//!         if status.is_connected() {
//!             break;
//!         }
//!     }
//!
//!     client.send_message(&OutboundRequest::text("Hi")).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod subscription;
pub mod types;

pub use client::Client;
pub use config::SessionConfig;
pub use subscription::BotMessageParser;
pub use types::request::OutboundRequest;
pub use types::response::{Button, ButtonsContent, ImageContent, InboundMessage};

pub use crate::ws::ConnectionStatus;
