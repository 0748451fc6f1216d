//! Chat client entry point
//!
//! Run with:
//! ```bash
//! cargo run -p chat-client
//! ```
//!
//! Every stdin line is sent as a chat message. `/quit` exits, `/reconnect`
//! forces a new connection and `/visible` replays a page-visibility event.

use chat_client::events::log_events;
use chat_client::{
    ClientError, ConnectionManager, ConsoleRenderer, TypingNotifier, WebSocketTransport,
};
use chat_common::{try_init_tracing_with_config, ClientConfig, TracingConfig};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(TracingConfig::from_settings(&config.app)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Chat client failed");
        std::process::exit(1);
    }
}

async fn run(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        app = %config.app.name,
        env = ?config.app.env,
        url = %config.relay.url,
        "Starting chat client"
    );

    let transport = Arc::new(WebSocketTransport::new(config.relay.connect_timeout()));
    let typing_idle = config.relay.typing_idle();
    let manager = ConnectionManager::new(config.relay, transport, Arc::new(ConsoleRenderer::new()));
    let notifier = TypingNotifier::new(Arc::clone(&manager), typing_idle);

    // Log observer events
    tokio::spawn(log_events(manager.subscribe()));

    manager.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                if !handle_line(&manager, &notifier, line.trim()) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    notifier.clear();
    manager.stop();
    info!("Chat client stopped");

    Ok(())
}

/// Handle one input line; returns `false` when the client should exit
fn handle_line(manager: &Arc<ConnectionManager>, notifier: &TypingNotifier, line: &str) -> bool {
    match line {
        "" => {}
        "/quit" => return false,
        "/reconnect" => manager.connect(),
        "/visible" => manager.on_visibility_change(true),
        // Stdin yields whole lines, so there are no keystrokes to report
        content => {
            match notifier.submit(content) {
                // Already shown as a banner
                Ok(()) | Err(ClientError::NotConnected) => {}
                Err(e) => error!(error = %e, "Failed to send message"),
            }
        }
    }

    true
}
