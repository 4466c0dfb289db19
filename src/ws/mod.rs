//! Realtime channel infrastructure.
//!
//! Speaks the GraphQL-over-websocket subprotocol (`graphql-ws`) used by AppSync style
//! realtime endpoints: `connection_init`, `connection_ack`, `start`/`start_ack`, `data`,
//! `ka` keep-alives and `stop`.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: Runs one connection per subscription and publishes its status
//! - [`MessageParser`]: Trait for turning `data` payloads into typed messages
//! - [`frame`]: Wire frames of the subprotocol
//!
//! # Example
//!
//! ```ignore
//! let manager = ConnectionManager::new(Config::default(), MyParser);
//! let request = client_request("wss://example.com/graphql/realtime")?;
//! let handle = manager.connect(request, start_frame, Arc::new(|message| println!("{message:?}")));
//!
//! // later
//! handle.cancel();
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod traits;

pub use config::Config;
pub use connection::{
    ConnectionManager, ConnectionStatus, MessageCallback, SubscriptionHandle, client_request,
};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use frame::{ClientFrame, Operation, ServerFrame};
pub use traits::*;
