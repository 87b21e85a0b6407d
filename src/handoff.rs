//! Handoff Router (C9, spec.md §4.9). Diverts in-flight brain output to a
//! text sink while the designated speaker is absent from the voice channel.

use crate::platform::VoicePlatform;
use crate::types::{SpeakerId, TaskId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Window within which a presence transition to absent still warrants a
/// short "session ended, last topic X" courtesy note (§4.9).
const RECENT_UTTERANCE_WINDOW: Duration = Duration::from_secs(120);

pub struct HandoffRouter {
    platform: Arc<dyn VoicePlatform>,
    present: AtomicBool,
    last_utterance: Mutex<Option<(SpeakerId, String, Instant)>>,
}

impl HandoffRouter {
    pub fn new(platform: Arc<dyn VoicePlatform>) -> Arc<Self> {
        Arc::new(Self { platform, present: AtomicBool::new(true), last_utterance: Mutex::new(None) })
    }

    pub fn is_absent(&self) -> bool {
        !self.present.load(Ordering::SeqCst)
    }

    /// Record a dispatched transcript so an absence shortly after can carry
    /// a "last topic" hint.
    pub fn note_utterance(&self, speaker: &SpeakerId, transcript: &str) {
        *self.last_utterance.lock().unwrap() = Some((speaker.clone(), transcript.to_string(), Instant::now()));
    }

    /// Apply a presence transition for the designated speaker. `active_tasks`
    /// is the task manager's current active count, used to decide whether a
    /// "session ended" courtesy note applies.
    pub async fn on_presence(&self, present: bool, active_tasks: usize) {
        let was_present = self.present.swap(present, Ordering::SeqCst);
        if was_present == present {
            return;
        }

        if present {
            info!("designated speaker returned, clearing handoff flag");
            return;
        }

        info!("designated speaker left the channel, diverting in-flight output to text");
        if active_tasks == 0 {
            if let Some((_, topic, at)) = self.last_utterance.lock().unwrap().clone() {
                if at.elapsed() < RECENT_UTTERANCE_WINDOW {
                    let note = format!("Session ended — last topic: {topic}");
                    if let Err(e) = self.platform.post_text(None, &note).await {
                        warn!(error = %e, "failed to post session-ended note");
                    }
                }
            }
        }
    }

    /// Route one sentence produced for `task_id` to the fallback text sink
    /// instead of audio playback, prefixed with a handoff marker (§4.9).
    pub async fn divert(&self, task_id: TaskId, text: &str) {
        let message = format!("[handoff:{task_id}] {text}");
        if let Err(e) = self.platform.post_text(None, &message).await {
            warn!(error = %e, "failed to post handoff text");
        }
    }
}
