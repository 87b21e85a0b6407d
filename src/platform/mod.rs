//! Voice platform client (spec.md §6.1) — an external collaborator. The
//! trait below is the narrow interface this crate consumes; a production
//! binary would implement it against a real voice-chat SDK. [`fake`]
//! provides a deterministic test double used throughout the test suite.

pub mod fake;

use crate::error::PlatformError;
use crate::types::{AudioSegment, SpeakerId};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// Events the platform pushes to the session (§6.1, §5 "events, not polling").
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    /// Voice channel join completed and frames may start arriving.
    Ready,
    /// Decoded opus frame for an allow-listed speaker (16-bit mono PCM).
    OpusFrame { speaker: SpeakerId, pcm: Vec<i16>, sample_rate_hz: u32 },
    SpeakingStart { speaker: SpeakerId },
    SpeakingEnd { speaker: SpeakerId },
    /// A user's attach/detach transition on the voice channel.
    Presence { user: SpeakerId, present: bool },
    /// The platform's audio player finished the current resource.
    PlaybackIdle,
    /// Transport-level disconnect; the session reconnects with backoff.
    Disconnected { reason: String },
}

#[async_trait]
pub trait VoicePlatform: Send + Sync {
    /// Join the configured (server, voice channel) and start receiving events.
    async fn connect(&self) -> Result<mpsc::Receiver<PlatformEvent>, PlatformError>;

    /// Submit an audio resource for playback; the platform emits
    /// `PlaybackIdle` on natural completion. Playback is interrupted by `stop()`.
    async fn play(&self, segment: &AudioSegment) -> Result<(), PlatformError>;

    /// Stop whatever is currently playing (barge-in / `clear()`).
    async fn stop(&self) -> Result<(), PlatformError>;

    /// Post a text message to the configured text channel, or DM a user
    /// when `user` is `Some` (handoff router, §4.9).
    async fn post_text(&self, user: Option<&str>, text: &str) -> Result<(), PlatformError>;
}

/// Reconnect a `VoicePlatform` with exponential backoff (SPEC_FULL §B):
/// 1s initial delay, doubling, capped at 30s, unlimited retries, reset on
/// success. Returns the event receiver from the first successful connect
/// and keeps reconnecting in the background, re-delivering `Ready` /
/// `Disconnected` transitions onto the same forwarding channel so callers
/// observe a single continuous event stream.
pub async fn connect_with_reconnect(
    platform: std::sync::Arc<dyn VoicePlatform>,
) -> mpsc::Receiver<PlatformEvent> {
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(async move {
        let mut delay = Duration::from_secs(1);
        const MAX_DELAY: Duration = Duration::from_secs(30);
        loop {
            match platform.connect().await {
                Ok(mut upstream) => {
                    delay = Duration::from_secs(1);
                    while let Some(event) = upstream.recv().await {
                        let disconnected = matches!(event, PlatformEvent::Disconnected { .. });
                        if tx.send(event).await.is_err() {
                            return;
                        }
                        if disconnected {
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "voice platform connect failed, retrying");
                }
            }
            tokio::time::sleep(delay).await;
            delay = std::cmp::min(delay * 2, MAX_DELAY);
        }
    });
    rx
}
