//! Chat with a BotCircuits bot from the terminal.
//!
//! Lines typed on stdin are sent to the bot; its replies are logged as they arrive. When the
//! bot offers buttons, typing a button number sends that button's payload.
//!
//! Run with tracing enabled:
//! ```sh
//! BOTCIRCUITS_APP_ID=... BOTCIRCUITS_API_KEY=... \
//!     RUST_LOG=info cargo run --example console_chat --features tracing
//! ```

use std::io::BufRead as _;
use std::sync::{Arc, Mutex, PoisonError};

use botcircuits_client_sdk::DEFAULT_HOST;
use botcircuits_client_sdk::session::{
    Button, Client, ConnectionStatus, InboundMessage, OutboundRequest, SessionConfig,
};
use futures::StreamExt as _;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = SessionConfig::builder()
        .app_id(std::env::var("BOTCIRCUITS_APP_ID")?)
        .api_key(std::env::var("BOTCIRCUITS_API_KEY")?)
        .host(std::env::var("BOTCIRCUITS_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned()))
        .build();
    let client = Client::new(config)?;
    info!(session_id = client.session_id(), "Session created");

    // Buttons of the most recent BUTTONS message, picked by number
    let buttons: Arc<Mutex<Vec<Button>>> = Arc::default();
    let offered = Arc::clone(&buttons);

    client
        .start_subscription(move |message: InboundMessage| {
            if let Some(content) = message.as_buttons() {
                for (i, button) in content.buttons.iter().enumerate() {
                    info!(option = i + 1, title = %button.title);
                }
                *offered.lock().unwrap_or_else(PoisonError::into_inner) = content.buttons.clone();
            }
            info!(bot = %message);
        })
        .await?;

    let mut statuses = Box::pin(client.status_changes());
    while let Some(status) = statuses.next().await {
        info!(%status, "Connection status");
        match status {
            ConnectionStatus::Connected => break,
            ConnectionStatus::Error => anyhow::bail!("Unable to subscribe to bot messages"),
            _ => {}
        }
    }

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    tokio::task::spawn_blocking(move || {
        for line in std::io::stdin().lock().lines().map_while(Result::ok) {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    while let Some(line) = line_rx.recv().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let picked = line.parse::<usize>().ok().and_then(|n| {
            buttons
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(n.checked_sub(1)?)
                .cloned()
        });
        let request = match picked {
            Some(button) => OutboundRequest::button(&button),
            None => OutboundRequest::text(line),
        };

        if let Err(e) = client.send_message(&request).await {
            warn!(error = %e, "Message not delivered");
        }
    }

    client.close().await;
    Ok(())
}
