//! End-to-end scenario tests (spec.md §8) exercising the Task Manager
//! against a real local SSE server standing in for the brain endpoint.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use voice_bridge::brain::BrainClient;
use voice_bridge::gate::ConversationGate;
use voice_bridge::handoff::HandoffRouter;
use voice_bridge::metrics::Metrics;
use voice_bridge::platform::fake::FakePlatform;
use voice_bridge::playback::PlaybackQueue;
use voice_bridge::router::{route, RouteDecision};
use voice_bridge::tasks::{TaskManager, TaskManagerDeps};
use voice_bridge::tts::fake::FakeTtsProvider;
use voice_bridge::tts::SynthesisPipeline;

/// Spins up a one-shot SSE server that waits `delay` before writing its
/// response, standing in for a brain reply that takes that long to arrive.
async fn delayed_sse_server(delay: Duration, sentence: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            let body = format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{sentence}\"}}}}]}}\n\ndata: [DONE]\n\n");
            let response =
                format!("HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n{body}");
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}

fn build_task_manager(brain_url: String, platform: Arc<FakePlatform>) -> (Arc<TaskManager>, Arc<PlaybackQueue>) {
    let pq = PlaybackQueue::new(platform.clone());
    let synthesis = Arc::new(SynthesisPipeline::new(vec![Box::new(FakeTtsProvider::succeeding("p"))], pq.clone()));
    let gate = Arc::new(ConversationGate::new(false, vec![], Duration::from_secs(60)));
    let handoff = HandoffRouter::new(platform.clone());
    let brain = Arc::new(BrainClient::new(brain_url, "token".into(), "model".into(), "session".into()));
    let metrics = Arc::new(Metrics::default());
    let tm = TaskManager::new(TaskManagerDeps {
        brain,
        synthesis,
        gate,
        handoff,
        metrics,
        history_cap: 40,
        idle_ttl: Duration::from_secs(1800),
    });
    (tm, pq)
}

#[tokio::test]
async fn single_utterance_yields_one_segment_and_closes_history() {
    let platform = Arc::new(FakePlatform::new());
    let base_url = delayed_sse_server(Duration::from_millis(10), "It is ten past three.").await;
    let (tm, _pq) = build_task_manager(base_url, platform.clone());

    let decision = route("what time is it");
    assert_eq!(decision, RouteDecision::Dispatch);
    tm.dispatch("u1".to_string(), "what time is it".to_string());

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(tm.active_count(), 0);
    assert_eq!(tm.history_len(&"u1".to_string()), 2);
    assert_eq!(platform.play_count(), 1);
}

#[tokio::test]
async fn stop_during_speech_cancels_in_flight_task() {
    let platform = Arc::new(FakePlatform::new());
    let base_url = delayed_sse_server(Duration::from_millis(2_000), "a long answer nobody hears").await;
    let (tm, pq) = build_task_manager(base_url, platform.clone());

    tm.dispatch("u1".to_string(), "tell me a long story".to_string());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(tm.active_count(), 1);

    assert_eq!(route("stop"), RouteDecision::Stop);
    let cancelled = tm.cancel_all();
    pq.clear();

    assert_eq!(cancelled, 1);
    assert_eq!(tm.active_count(), 0);
    assert_eq!(pq.len(), 0);
}

#[tokio::test]
async fn wake_only_transcript_never_dispatches() {
    let platform = Arc::new(FakePlatform::new());
    let base_url = delayed_sse_server(Duration::from_millis(10), "unused").await;
    let (tm, _pq) = build_task_manager(base_url, platform.clone());

    assert_eq!(route("."), RouteDecision::WakeOnly);
    assert_eq!(route("a"), RouteDecision::WakeOnly);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(tm.active_count(), 0);
    assert_eq!(tm.history_len(&"u1".to_string()), 0);
}
