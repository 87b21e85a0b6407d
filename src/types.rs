//! Shared data model (spec.md §3).

use std::time::{Duration, SystemTime};

/// Id of a speaker as reported by the voice platform (stable per user, not per session).
pub type SpeakerId = String;

/// Monotonic id of an in-flight brain task.
pub type TaskId = u64;

/// A completed span of speech for one speaker. Created by the audio segmenter
/// on silence timeout; consumed exactly once by the transcriber (I2).
#[derive(Debug, Clone)]
pub struct Utterance {
    pub speaker: SpeakerId,
    /// 16-bit mono PCM samples.
    pub pcm: Vec<i16>,
    pub sample_rate_hz: u32,
    pub captured_at: SystemTime,
    pub duration: Duration,
}

impl Utterance {
    pub fn rms(&self) -> f64 {
        if self.pcm.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.pcm.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / self.pcm.len() as f64).sqrt()
    }
}

/// Immutable text produced from an utterance. May be empty (filtered upstream).
#[derive(Debug, Clone)]
pub struct Transcript {
    pub speaker: SpeakerId,
    pub text: String,
}

/// Conversational role, mirrored onto the brain's `messages` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of per-speaker conversation history.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// An opaque playable unit produced by synthesis and consumed once by playback.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub task_id: Option<TaskId>,
    pub bytes: Vec<u8>,
    /// Rough estimate used to bound the playback-completion wait (§4.8).
    pub estimated_duration: Duration,
}

/// Alert priority (spec.md §3, I6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Normal,
    Urgent,
}
