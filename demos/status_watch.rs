//! Watch a session's connection status and message stream.
//!
//! Subscribes, then logs every status change and every message until the connection ends or
//! a minute passes.
//!
//! Run with tracing enabled:
//! ```sh
//! BOTCIRCUITS_APP_ID=... BOTCIRCUITS_API_KEY=... \
//!     RUST_LOG=debug cargo run --example status_watch --features tracing
//! ```

use std::time::Duration;

use botcircuits_client_sdk::session::{Client, ConnectionStatus, SessionConfig};
use futures::StreamExt as _;
use tokio::time::timeout;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = SessionConfig::builder()
        .app_id(std::env::var("BOTCIRCUITS_APP_ID")?)
        .api_key(std::env::var("BOTCIRCUITS_API_KEY")?)
        .build();
    let client = Client::new(config)?;

    let watcher = client.clone();
    let status_task = tokio::spawn(async move {
        let mut statuses = Box::pin(watcher.status_changes());
        while let Some(status) = statuses.next().await {
            info!(%status, "Connection status changed");
            if matches!(status, ConnectionStatus::Error) {
                break;
            }
        }
    });

    let mut messages = Box::pin(client.messages());
    client.start_subscription(|_| {}).await?;

    while let Ok(Some(result)) = timeout(Duration::from_secs(60), messages.next()).await {
        match result {
            Ok(message) => info!(message_type = message.message_type(), %message),
            Err(e) => debug!(error = %e),
        }
    }

    client.close().await;
    status_task.abort();
    Ok(())
}
