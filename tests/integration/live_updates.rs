//! Integration tests for the live update channel.
//!
//! Starts a real server on a random port, connects WebSocket observers, and
//! checks that every successful task mutation produces exactly one
//! `tasksUpdated` frame per observer while failed mutations produce none.
//! The end-to-end flow drives the HTTP routes against the same state the
//! socket observers are attached to.
//!
//! Verification command: `cargo test --test live_updates`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite;
use tower::ServiceExt;

use taskboard_proto::event::{self, ServerEvent};
use taskboard_server::server::{
    AppState, DEFAULT_MAX_BODY_SIZE, router, start_server, start_server_with_shutdown,
};

// =============================================================================
// Type aliases and helpers
// =============================================================================

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const QUIET: Duration = Duration::from_millis(150);

/// Starts a server over a fresh in-memory state.
async fn start() -> (std::net::SocketAddr, Arc<AppState>) {
    let state = Arc::new(AppState::in_memory());
    let (addr, _handle) = start_server("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("failed to start test server");
    (addr, state)
}

/// Connects an observer and consumes its `connected` greeting.
async fn connect_observer(addr: std::net::SocketAddr) -> WsStream {
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    let greeting = recv_event(&mut ws).await;
    assert!(
        matches!(greeting, ServerEvent::Connected { .. }),
        "expected Connected, got {greeting:?}"
    );
    ws
}

/// Receives and decodes the next event frame.
async fn recv_event(ws: &mut WsStream) -> ServerEvent {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("recv timed out")
        .unwrap()
        .unwrap();
    event::decode(msg.to_text().unwrap()).unwrap()
}

/// Asserts that no frame arrives within a short window.
async fn assert_silent(ws: &mut WsStream) {
    let result = tokio::time::timeout(QUIET, ws.next()).await;
    assert!(result.is_err(), "unexpected frame: {result:?}");
}

/// Sends one JSON request through `app` and returns the status and body.
async fn http(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn doc(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other:?}"),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn greeting_carries_distinct_subscriber_ids() {
    let (addr, state) = start().await;

    let mut ids = Vec::new();
    let mut sockets = Vec::new();
    for _ in 0..2 {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap();
        match recv_event(&mut ws).await {
            ServerEvent::Connected { subscriber_id } => ids.push(subscriber_id),
            other => panic!("expected Connected, got {other:?}"),
        }
        sockets.push(ws);
    }

    assert_ne!(ids[0], ids[1]);
    assert_eq!(state.hub.subscriber_count(), 2);
}

#[tokio::test]
async fn every_observer_sees_each_mutation_once() {
    let (addr, state) = start().await;
    let mut first = connect_observer(addr).await;
    let mut second = connect_observer(addr).await;

    let created = state
        .tasks
        .create(doc(json!({"title": "t", "category": "To-Do"})))
        .await
        .unwrap();
    let id = created.inserted_id.to_hex();

    state
        .tasks
        .update(&id, doc(json!({"category": "Done"})))
        .await
        .unwrap();
    state.tasks.delete(&id).await.unwrap();

    for ws in [&mut first, &mut second] {
        for _ in 0..3 {
            assert_eq!(recv_event(ws).await, ServerEvent::TasksUpdated);
        }
        assert_silent(ws).await;
    }
}

#[tokio::test]
async fn http_flow_broadcasts_once_per_mutation() {
    let (addr, state) = start().await;
    let app = router(Arc::clone(&state), DEFAULT_MAX_BODY_SIZE);
    let mut ws = connect_observer(addr).await;

    let (status, created) = http(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({"title": "t", "category": "To-Do", "order": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recv_event(&mut ws).await, ServerEvent::TasksUpdated);
    assert_silent(&mut ws).await;

    let id = created["insertedId"].as_str().unwrap().to_string();
    let task_uri = format!("/tasks/{id}");

    let (status, tasks) = http(&app, Method::GET, "/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks.as_array().unwrap().len(), 1);
    assert_silent(&mut ws).await;

    let (status, _) = http(&app, Method::PUT, &task_uri, Some(json!({"category": "Done"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recv_event(&mut ws).await, ServerEvent::TasksUpdated);
    assert_silent(&mut ws).await;

    let (status, task) = http(&app, Method::GET, &task_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["category"], json!("Done"));
    assert_silent(&mut ws).await;

    let reorder = json!({"category": "Done", "tasks": [{"_id": id, "order": 3}]});
    let (status, body) = http(&app, Method::PUT, "/reorder", Some(reorder)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(recv_event(&mut ws).await, ServerEvent::TasksUpdated);
    assert_silent(&mut ws).await;

    let (status, _) = http(&app, Method::DELETE, &task_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recv_event(&mut ws).await, ServerEvent::TasksUpdated);
    assert_silent(&mut ws).await;

    let (status, tasks) = http(&app, Method::GET, "/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(tasks.as_array().unwrap().is_empty());
    let (status, _) = http(&app, Method::PUT, "/tasks/nope", Some(json!({"x": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn reorder_batch_broadcasts_once() {
    let (addr, state) = start().await;
    let a = state.tasks.create(doc(json!({"order": 0}))).await.unwrap();
    let b = state.tasks.create(doc(json!({"order": 1}))).await.unwrap();
    let mut ws = connect_observer(addr).await;

    let entries = serde_json::from_value(json!([
        {"_id": b.inserted_id.to_hex(), "order": 0},
        {"_id": a.inserted_id.to_hex(), "order": 1}
    ]))
    .unwrap();
    state.tasks.reorder(Some("To-Do"), entries).await.unwrap();

    assert_eq!(recv_event(&mut ws).await, ServerEvent::TasksUpdated);
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn failed_mutations_are_silent() {
    let (addr, state) = start().await;
    let mut ws = connect_observer(addr).await;

    assert!(state.tasks.update("nope", doc(json!({}))).await.is_err());
    assert!(state.tasks.delete("nope").await.is_err());
    let entries = serde_json::from_value(json!([{"_id": "nope", "order": 0}])).unwrap();
    assert!(state.tasks.reorder(None, entries).await.is_err());

    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn reads_and_user_writes_are_silent() {
    let (addr, state) = start().await;
    let mut ws = connect_observer(addr).await;

    state.tasks.list().await.unwrap();
    state
        .users
        .register(doc(json!({"email": "a@example.com"})))
        .await
        .unwrap();

    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn late_observer_gets_no_replay() {
    let (addr, state) = start().await;
    state.tasks.create(doc(json!({"title": "early"}))).await.unwrap();

    let mut ws = connect_observer(addr).await;
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn disconnected_observer_does_not_block_others() {
    let (addr, state) = start().await;
    let mut stays = connect_observer(addr).await;
    let mut leaves = connect_observer(addr).await;

    leaves.close(None).await.unwrap();
    drop(leaves);
    for _ in 0..50 {
        if state.hub.subscriber_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(state.hub.subscriber_count(), 1);

    state.tasks.create(doc(json!({"title": "t"}))).await.unwrap();
    assert_eq!(recv_event(&mut stays).await, ServerEvent::TasksUpdated);
}

#[tokio::test]
async fn graceful_shutdown_closes_observers() {
    let state = Arc::new(AppState::in_memory());
    let (trigger, triggered) = tokio::sync::oneshot::channel::<()>();
    let hub = Arc::clone(&state.hub);
    let shutdown = async move {
        let _ = triggered.await;
        hub.close_all();
    };

    let (addr, handle) = start_server_with_shutdown(
        "127.0.0.1:0",
        router(Arc::clone(&state), 1024 * 1024),
        shutdown,
    )
    .await
    .unwrap();
    let mut ws = connect_observer(addr).await;

    trigger.send(()).unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("close timed out")
        .unwrap()
        .unwrap();
    assert!(matches!(frame, tungstenite::Message::Close(_)));

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
}
