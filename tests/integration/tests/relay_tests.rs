//! Relay Integration Tests
//!
//! Runs the connection manager over a real WebSocket against an in-process relay.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use chat_client::{ClientError, ClientEvent, ConnectionState, RenderCall, TypingNotifier};
use integration_tests::{
    eventually, relay_config, spawn_client, unreachable_url, wait_for_event, TestRelay,
};
use serde_json::json;
use std::time::Duration;

fn is_connected(event: &ClientEvent) -> bool {
    *event == ClientEvent::Connected
}

// ============================================================================
// Messaging
// ============================================================================

#[tokio::test]
async fn test_chat_round_trip() {
    let mut relay = TestRelay::start().await.expect("Failed to start relay");
    let (manager, renderer) = spawn_client(relay_config(relay.ws_url()));
    let mut events = manager.subscribe();

    manager.start();
    wait_for_event(&mut events, is_connected).await.unwrap();
    let mut session = relay.accept().await.unwrap();

    // Outbound chat carries the display name and a timestamp
    manager.send_chat("hello relay").unwrap();
    let sent = session.recv_json().await.unwrap();
    assert_eq!(sent["type"], "chat");
    assert_eq!(sent["content"], "hello relay");
    assert_eq!(sent["sender"], "You");
    let timestamp = sent["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());

    // Inbound chat reaches the renderer
    session
        .send_json(&json!({"type": "chat", "content": "hi", "sender": "Bob"}))
        .unwrap();
    eventually(|| {
        renderer.calls().contains(&RenderCall::Chat {
            content: "hi".to_string(),
            sender: "Bob".to_string(),
            avatar_ref: "Bob".to_string(),
        })
    })
    .await
    .unwrap();

    manager.stop();
}

#[tokio::test]
async fn test_typing_and_presence() {
    let mut relay = TestRelay::start().await.expect("Failed to start relay");
    let (manager, renderer) = spawn_client(relay_config(relay.ws_url()));
    let mut events = manager.subscribe();

    manager.start();
    wait_for_event(&mut events, is_connected).await.unwrap();
    let mut session = relay.accept().await.unwrap();

    manager.set_typing_status(true);
    assert_eq!(
        session.recv_json().await.unwrap(),
        json!({"type": "typing", "sender": "You", "isTyping": true})
    );

    session
        .send_json(&json!({"type": "typing", "sender": "Bob", "isTyping": true}))
        .unwrap();
    session
        .send_json(&json!({"type": "status", "userId": "bob", "status": "away"}))
        .unwrap();
    eventually(|| {
        renderer.calls().contains(&RenderCall::Presence {
            user_id: "bob".to_string(),
            status: "away".to_string(),
        })
    })
    .await
    .unwrap();
    assert!(renderer.calls().contains(&RenderCall::Typing {
        sender: "Bob".to_string(),
        is_typing: true,
    }));

    manager.stop();
}

#[tokio::test]
async fn test_typing_notifier_goes_idle() {
    let mut relay = TestRelay::start().await.expect("Failed to start relay");
    let config = relay_config(relay.ws_url());
    let idle = config.typing_idle();
    let (manager, _renderer) = spawn_client(config);
    let mut events = manager.subscribe();

    manager.start();
    wait_for_event(&mut events, is_connected).await.unwrap();
    let mut session = relay.accept().await.unwrap();

    let notifier = TypingNotifier::new(manager.clone(), idle);
    notifier.on_input();
    notifier.on_input();

    // Each keystroke re-sends the indicator; one stop follows the idle period
    assert_eq!(session.recv_json().await.unwrap()["isTyping"], true);
    assert_eq!(session.recv_json().await.unwrap()["isTyping"], true);
    assert_eq!(session.recv_json().await.unwrap()["isTyping"], false);
    assert!(!notifier.is_typing());

    manager.stop();
}

#[tokio::test]
async fn test_bad_payloads_keep_the_connection() {
    let mut relay = TestRelay::start().await.expect("Failed to start relay");
    let (manager, renderer) = spawn_client(relay_config(relay.ws_url()));
    let mut events = manager.subscribe();

    manager.start();
    wait_for_event(&mut events, is_connected).await.unwrap();
    let session = relay.accept().await.unwrap();

    session.send_text("{not json").unwrap();
    session.send_text(r#"{"type":"bogus","x":1}"#).unwrap();
    session.send_text(r#"{"type":"chat","sender":"Bob"}"#).unwrap();
    session
        .send_json(&json!({"type": "chat", "content": "still here", "sender": "Bob"}))
        .unwrap();

    eventually(|| {
        renderer
            .calls()
            .iter()
            .any(|call| matches!(call, RenderCall::Chat { content, .. } if content == "still here"))
    })
    .await
    .unwrap();

    let chats = renderer
        .calls()
        .into_iter()
        .filter(|call| matches!(call, RenderCall::Chat { .. }))
        .count();
    assert_eq!(chats, 1);
    assert_eq!(manager.state(), ConnectionState::Connected);

    manager.stop();
}

#[tokio::test]
async fn test_send_while_disconnected_is_rejected() {
    let relay = TestRelay::start().await.expect("Failed to start relay");
    let (manager, renderer) = spawn_client(relay_config(relay.ws_url()));
    let mut events = manager.subscribe();

    let err = manager.send_chat("too early").unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
    assert_eq!(
        wait_for_event(&mut events, |_| true).await.unwrap(),
        ClientEvent::SendFailed
    );
    assert_eq!(
        renderer.banners(),
        vec!["Message failed to send. Please check your connection.".to_string()]
    );
}

// ============================================================================
// Reconnection
// ============================================================================

#[tokio::test]
async fn test_reconnects_after_relay_close() {
    let mut relay = TestRelay::start().await.expect("Failed to start relay");
    let (manager, renderer) = spawn_client(relay_config(relay.ws_url()));
    let mut events = manager.subscribe();

    manager.start();
    wait_for_event(&mut events, is_connected).await.unwrap();
    relay.accept().await.unwrap().close();

    let event = wait_for_event(&mut events, |e| matches!(e, ClientEvent::Reconnecting { .. }))
        .await
        .unwrap();
    assert_eq!(
        event,
        ClientEvent::Reconnecting {
            attempt: 1,
            max_attempts: 5,
        }
    );

    wait_for_event(&mut events, is_connected).await.unwrap();
    let mut session = relay.accept().await.unwrap();
    assert_eq!(manager.retry_count(), 0);

    // The new link carries traffic
    manager.send_chat("back again").unwrap();
    assert_eq!(session.recv_json().await.unwrap()["content"], "back again");

    let banners = renderer.banners();
    assert!(banners.contains(&"Reconnecting... Attempt 1/5".to_string()));
    assert_eq!(
        banners.iter().filter(|b| *b == "Connected to chat").count(),
        2
    );

    manager.stop();
}

#[tokio::test]
async fn test_gives_up_when_relay_is_unreachable() {
    let url = unreachable_url().await.unwrap();
    let config = chat_common::RelayConfig {
        max_retries: 2,
        retry_delay_ms: 50,
        ..relay_config(url)
    };
    let (manager, renderer) = spawn_client(config);
    let mut events = manager.subscribe();

    manager.start();
    let event = wait_for_event(&mut events, |e| matches!(e, ClientEvent::RetriesExhausted { .. }))
        .await
        .unwrap();

    assert_eq!(event, ClientEvent::RetriesExhausted { attempts: 2 });
    assert_eq!(manager.state(), ConnectionState::Failed);
    assert_eq!(
        renderer.banners().last().map(String::as_str),
        Some("Connection failed. Please refresh the page.")
    );

    // No automatic attempts after giving up
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(manager.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_visibility_reconnects_after_failure() {
    let mut relay = TestRelay::start().await.expect("Failed to start relay");
    let config = chat_common::RelayConfig {
        max_retries: 0,
        ..relay_config(relay.ws_url())
    };
    let (manager, _renderer) = spawn_client(config);
    let mut events = manager.subscribe();

    manager.start();
    wait_for_event(&mut events, is_connected).await.unwrap();

    // With no retries allowed the first drop is final
    relay.accept().await.unwrap().close();
    wait_for_event(&mut events, |e| matches!(e, ClientEvent::RetriesExhausted { .. }))
        .await
        .unwrap();
    assert_eq!(manager.state(), ConnectionState::Failed);
    relay
        .expect_no_connection(Duration::from_millis(300))
        .await
        .unwrap();

    manager.on_visibility_change(true);
    wait_for_event(&mut events, is_connected).await.unwrap();
    relay.accept().await.unwrap();
    assert_eq!(manager.state(), ConnectionState::Connected);

    manager.stop();
}

#[tokio::test]
async fn test_stop_closes_without_retrying() {
    let mut relay = TestRelay::start().await.expect("Failed to start relay");
    let (manager, _renderer) = spawn_client(relay_config(relay.ws_url()));
    let mut events = manager.subscribe();

    manager.start();
    wait_for_event(&mut events, is_connected).await.unwrap();
    let mut session = relay.accept().await.unwrap();

    manager.stop();
    wait_for_event(&mut events, |e| *e == ClientEvent::Stopped)
        .await
        .unwrap();
    session.closed().await.unwrap();

    relay
        .expect_no_connection(Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}
