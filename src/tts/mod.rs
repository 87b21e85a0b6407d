//! Synthesis Pipeline (C7, spec.md §4.7). Synthesizes each sentence to
//! audio via a cascade of TTS providers and pushes the result into the
//! Playback Queue, tagged with its originating task.

pub mod fake;
pub mod http;

use crate::error::TtsError;
use crate::playback::PlaybackQueue;
use crate::types::{AudioSegment, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// `synthesize(text) -> audioBlob` (§6.3).
#[async_trait]
pub trait TtsProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError>;
}

/// Rough spoken-words-per-second used to estimate playback duration for
/// the Playback Queue's completion timeout (§4.8); not a precision figure.
const WORDS_PER_SECOND: f64 = 2.5;

pub struct SynthesisPipeline {
    providers: Vec<Box<dyn TtsProvider>>,
    playback: Arc<PlaybackQueue>,
}

impl SynthesisPipeline {
    pub fn new(providers: Vec<Box<dyn TtsProvider>>, playback: Arc<PlaybackQueue>) -> Self {
        Self { providers, playback }
    }

    /// Synthesize `sentence` and enqueue it for playback, tagged with `task_id`.
    /// Returns `true` if a segment was enqueued.
    pub async fn synthesize_and_enqueue(&self, sentence: &str, task_id: Option<TaskId>) -> bool {
        let sanitized = sanitize(sentence);
        if is_only_punctuation(&sanitized) {
            debug!(sentence, "sentence is only punctuation after sanitation, skipping synthesis");
            return false;
        }

        for provider in &self.providers {
            match provider.synthesize(&sanitized).await {
                Ok(bytes) => {
                    let segment = AudioSegment {
                        task_id,
                        bytes,
                        estimated_duration: estimate_duration(&sanitized),
                    };
                    self.playback.enqueue(segment);
                    return true;
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "tts provider failed, trying next");
                }
            }
        }
        warn!(sentence, "all tts providers failed, dropping sentence");
        false
    }
}

/// Strip control characters, zero-width characters, and soft hyphens (§4.7).
fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            !c.is_control()
                && c != '\u{00AD}' // soft hyphen
                && c != '\u{200B}' // zero-width space
                && c != '\u{200C}' // zero-width non-joiner
                && c != '\u{200D}' // zero-width joiner
                && c != '\u{FEFF}' // zero-width no-break space / BOM
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_only_punctuation(text: &str) -> bool {
    text.is_empty() || text.chars().all(|c| !c.is_alphanumeric())
}

fn estimate_duration(text: &str) -> Duration {
    let words = text.split_whitespace().count().max(1) as f64;
    Duration::from_secs_f64((words / WORDS_PER_SECOND).max(0.5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::FakeTtsProvider;

    #[tokio::test]
    async fn skips_synthesis_for_punctuation_only() {
        let provider = FakeTtsProvider::succeeding("p");
        let calls = provider.call_count.clone();
        let pq = PlaybackQueue::new(Arc::new(crate::platform::fake::FakePlatform::new()));
        let pipeline = SynthesisPipeline::new(vec![Box::new(provider)], pq.clone());
        let enqueued = pipeline.synthesize_and_enqueue("...", Some(1)).await;
        assert!(!enqueued);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn cascades_on_provider_failure() {
        let failing = FakeTtsProvider::failing("bad");
        let working = FakeTtsProvider::succeeding("good");
        let pq = PlaybackQueue::new(Arc::new(crate::platform::fake::FakePlatform::new()));
        let pipeline = SynthesisPipeline::new(vec![Box::new(failing), Box::new(working)], pq.clone());
        let enqueued = pipeline.synthesize_and_enqueue("hello there", Some(1)).await;
        assert!(enqueued);
        assert_eq!(pq.len() + if pq.is_playing() { 1 } else { 0 }, 1);
    }

    #[test]
    fn sanitize_strips_zero_width_and_control_chars() {
        let cleaned = sanitize("he\u{200B}llo\u{0007} world\u{00AD}");
        assert_eq!(cleaned, "hello world");
    }
}
