//! Integration test driving `BrainClient` against a hand-rolled SSE server,
//! covering streaming sentence emission, cancellation, and non-2xx fallback.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use voice_bridge::brain::BrainClient;
use voice_bridge::brain::BrainOutcome;
use voice_bridge::types::{HistoryEntry, Role};

async fn spawn_sse_server(body_events: Vec<&'static str>, status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await; // drain the request
            let mut body = String::new();
            for event in body_events {
                body.push_str(event);
            }
            let response = format!(
                "{status_line}\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n{body}"
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn streams_sentences_and_completes() {
    let events = vec![
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello world. \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"How are you?\"}}]}\n\n",
        "data: [DONE]\n\n",
    ];
    let base_url = spawn_sse_server(events, "HTTP/1.1 200 OK").await;
    let client = BrainClient::new(base_url, "token".into(), "model".into(), "session".into());

    let sentences = Arc::new(Mutex::new(Vec::new()));
    let s = sentences.clone();
    let outcome = client
        .stream_reply("hi", &[], CancellationToken::new(), move |sentence| {
            s.lock().unwrap().push(sentence);
        })
        .await;

    match outcome {
        BrainOutcome::Completed(text) => assert!(text.contains("Hello world")),
        other => panic!("expected Completed, got {other:?}"),
    }
    let got = sentences.lock().unwrap().clone();
    assert_eq!(got, vec!["Hello world.".to_string(), "How are you?".to_string()]);
}

#[tokio::test]
async fn non_2xx_yields_error_fallback() {
    let base_url = spawn_sse_server(vec!["internal error"], "HTTP/1.1 500 Internal Server Error").await;
    let client = BrainClient::new(base_url, "token".into(), "model".into(), "session".into());
    let outcome = client.stream_reply("hi", &[], CancellationToken::new(), |_| {}).await;
    match outcome {
        BrainOutcome::Error(msg) => assert!(!msg.is_empty()),
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_before_start_aborts_immediately() {
    let base_url = spawn_sse_server(vec!["data: [DONE]\n\n"], "HTTP/1.1 200 OK").await;
    let client = BrainClient::new(base_url, "token".into(), "model".into(), "session".into());
    let token = CancellationToken::new();
    token.cancel();
    let outcome = client.stream_reply("hi", &[], token, |_| {}).await;
    assert!(matches!(outcome, BrainOutcome::Aborted));
}

#[tokio::test]
async fn history_window_is_forwarded() {
    let events = vec!["data: {\"choices\":[{\"delta\":{\"content\":\"ok.\"}}]}\n\n", "data: [DONE]\n\n"];
    let base_url = spawn_sse_server(events, "HTTP/1.1 200 OK").await;
    let client = BrainClient::new(base_url, "token".into(), "model".into(), "session".into());
    let history = vec![
        HistoryEntry { role: Role::User, content: "previous question".into() },
        HistoryEntry { role: Role::Assistant, content: "previous answer".into() },
    ];
    let outcome = client.stream_reply("next question", &history, CancellationToken::new(), |_| {}).await;
    assert!(matches!(outcome, BrainOutcome::Completed(_)));
    // Wall-clock bound sanity: the server above closes promptly.
    tokio::time::timeout(Duration::from_secs(1), async {}).await.unwrap();
}
