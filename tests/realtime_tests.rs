mod common;

use common::{spawn_server, test_state, token_for, wait_for_members};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite};

type Client = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(url: String) -> Client {
    let (client, _) = connect_async(url).await.unwrap();
    client
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let message = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        if let tungstenite::Message::Text(text) = message {
            return text;
        }
    }
}

#[tokio::test]
async fn test_anonymous_upgrade_is_refused() {
    let state = test_state().await;
    let addr = spawn_server(state.clone()).await;

    for path in ["messages", "notifications"] {
        match connect_async(format!("ws://{}/ws/{}/", addr, path)).await {
            Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
            other => panic!("expected 401, got {:?}", other.map(|(_, r)| r.status())),
        }
    }

    // 无效令牌同样视为匿名
    let result = connect_async(format!("ws://{}/ws/messages/?token=garbage", addr)).await;
    assert!(matches!(result, Err(tungstenite::Error::Http(ref r)) if r.status() == 401));
    assert_eq!(state.broker.member_count("notifications").await, 0);
}

#[tokio::test]
async fn test_private_message_is_pushed_and_echo_returned() {
    let state = test_state().await;
    let addr = spawn_server(state.clone()).await;
    let (alice, _) = token_for(&state, "u-alice", "alice");
    let (_, bob_token) = token_for(&state, "u-bob", "bob");

    let mut bob = connect(format!("ws://{}/ws/messages/?token={}", addr, bob_token)).await;
    wait_for_members(&state, "bob", 1).await;

    let sent = state
        .message_service
        .send_message(&alice, "bob", "**hello** bob")
        .await
        .unwrap()
        .expect("message should be sent");

    let push: Value = serde_json::from_str(&next_text(&mut bob).await).unwrap();
    assert_eq!(push["type"], "receive");
    assert_eq!(push["sender"], "alice");
    assert_eq!(push["message"], Value::String(sent.rendered.clone()));
    assert!(sent.rendered.contains("<strong>hello</strong>"));

    // 客户端发来的内容原样回显
    bob.send(tungstenite::Message::Text("{\"ack\":1}".to_string()))
        .await
        .unwrap();
    assert_eq!(next_text(&mut bob).await, "{\"ack\":1}");

    bob.close(None).await.unwrap();
    wait_for_members(&state, "bob", 0).await;
}

#[tokio::test]
async fn test_new_post_is_broadcast_on_notifications_channel() {
    let state = test_state().await;
    let addr = spawn_server(state.clone()).await;
    let (_, alice_token) = token_for(&state, "u-alice", "alice");
    let (bob, _) = token_for(&state, "u-bob", "bob");

    let mut alice = connect(format!("ws://{}/ws/notifications/?token={}", addr, alice_token)).await;
    wait_for_members(&state, "notifications", 1).await;

    state.news_service.post_news(&bob, "fresh news").await.unwrap();

    let push: Value = serde_json::from_str(&next_text(&mut alice).await).unwrap();
    assert_eq!(
        push,
        serde_json::json!({"type": "receive", "key": "additional_news", "actor_name": "bob"})
    );

    drop(alice);
    wait_for_members(&state, "notifications", 0).await;
}

#[tokio::test]
async fn test_messages_only_reach_the_recipient_group() {
    let state = test_state().await;
    let addr = spawn_server(state.clone()).await;
    let (alice, alice_token) = token_for(&state, "u-alice", "alice");
    let (_, bob_token) = token_for(&state, "u-bob", "bob");
    let (_, carol_token) = token_for(&state, "u-carol", "carol");

    let mut bob = connect(format!("ws://{}/ws/messages/?token={}", addr, bob_token)).await;
    let mut carol = connect(format!("ws://{}/ws/messages/?token={}", addr, carol_token)).await;
    let _alice_ws = connect(format!("ws://{}/ws/messages/?token={}", addr, alice_token)).await;
    wait_for_members(&state, "bob", 1).await;
    wait_for_members(&state, "carol", 1).await;

    state
        .message_service
        .send_message(&alice, "bob", "just for bob")
        .await
        .unwrap();
    let push: Value = serde_json::from_str(&next_text(&mut bob).await).unwrap();
    assert_eq!(push["sender"], "alice");

    // carol 只会收到自己的回显
    carol
        .send(tungstenite::Message::Text("marker".to_string()))
        .await
        .unwrap();
    assert_eq!(next_text(&mut carol).await, "marker");
}
