//! Playback Queue (C8, spec.md §4.8). A single serialized worker; admits
//! audio segments from any task; supports clear-and-stop. Enforces I3 (at
//! most one segment playing at any instant) and P1/P3.

use crate::platform::VoicePlatform;
use crate::types::AudioSegment;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, warn};

const MAX_WAIT: Duration = Duration::from_secs(60);
const MIN_WAIT: Duration = Duration::from_millis(500);
/// Fraction of the expected duration below which an unsolicited idle event
/// is treated as premature rather than genuine completion.
const PREMATURE_FRACTION: f32 = 0.5;

pub struct PlaybackQueue {
    platform: Arc<dyn VoicePlatform>,
    queue: Mutex<VecDeque<AudioSegment>>,
    playing: AtomicBool,
    /// Bumped on every `clear()`; lets the worker detect that the segment
    /// it is waiting on was cleared out from under it.
    generation: AtomicU64,
    idle: Notify,
    enqueued: Notify,
    /// Set by the audio segmenter immediately before a barge-in `clear()`
    /// so a subsequent idle event is recognized as legitimate rather than
    /// a premature/spurious one (§4.8).
    barge_in_flag: AtomicBool,
}

impl PlaybackQueue {
    pub fn new(platform: Arc<dyn VoicePlatform>) -> Arc<Self> {
        let queue = Arc::new(Self {
            platform,
            queue: Mutex::new(VecDeque::new()),
            playing: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            idle: Notify::new(),
            enqueued: Notify::new(),
            barge_in_flag: AtomicBool::new(false),
        });
        tokio::spawn(queue.clone().run());
        queue
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn enqueue(&self, segment: AudioSegment) {
        self.queue.lock().unwrap().push_back(segment);
        self.enqueued.notify_one();
    }

    /// Drop all queued segments and stop the currently playing one.
    pub fn clear(&self) {
        self.clear_inner(false);
    }

    /// Like `clear()`, but tags the clear as a genuine barge-in so the
    /// worker does not mistake the resulting idle event for a spurious one.
    pub fn clear_for_barge_in(&self) {
        self.clear_inner(true);
    }

    fn clear_inner(&self, barge_in: bool) {
        self.queue.lock().unwrap().clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.barge_in_flag.store(barge_in, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
        let platform = self.platform.clone();
        tokio::spawn(async move {
            if let Err(e) = platform.stop().await {
                warn!(error = %e, "platform stop() failed during clear()");
            }
        });
        self.idle.notify_waiters();
    }

    /// Called by the session's event loop when the platform reports its
    /// player went idle.
    pub fn on_platform_idle(&self) {
        self.idle.notify_waiters();
    }

    async fn run(self: Arc<Self>) {
        loop {
            let segment = loop {
                if let Some(s) = self.queue.lock().unwrap().pop_front() {
                    break s;
                }
                self.enqueued.notified().await;
            };

            let my_gen = self.generation.load(Ordering::SeqCst);
            self.playing.store(true, Ordering::SeqCst);
            self.barge_in_flag.store(false, Ordering::SeqCst);

            if let Err(e) = self.platform.play(&segment).await {
                warn!(error = %e, "playback error, abandoning segment");
                self.playing.store(false, Ordering::SeqCst);
                continue;
            }

            let expected = segment.estimated_duration;
            let timeout_dur = expected.min(MAX_WAIT).max(MIN_WAIT);
            let start = Instant::now();

            loop {
                if self.generation.load(Ordering::SeqCst) != my_gen {
                    // cleared out from under us while playing
                    break;
                }
                match tokio::time::timeout(timeout_dur, self.idle.notified()).await {
                    Ok(()) => {
                        if self.generation.load(Ordering::SeqCst) != my_gen {
                            break;
                        }
                        let elapsed = start.elapsed();
                        let premature = elapsed.as_secs_f32()
                            < expected.as_secs_f32() * PREMATURE_FRACTION
                            && !self.barge_in_flag.load(Ordering::SeqCst);
                        if premature {
                            debug!(?elapsed, ?expected, "premature idle event, re-arming wait");
                            continue;
                        }
                        break;
                    }
                    Err(_) => {
                        debug!("playback wait timed out, treating as complete");
                        break;
                    }
                }
            }
            self.playing.store(false, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakePlatform;

    fn seg(ms: u64) -> AudioSegment {
        AudioSegment {
            task_id: None,
            bytes: vec![0u8; 4],
            estimated_duration: Duration::from_millis(ms),
        }
    }

    #[tokio::test]
    async fn single_player_invariant() {
        let platform = Arc::new(FakePlatform::new());
        let pq = PlaybackQueue::new(platform.clone());
        pq.enqueue(seg(20));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(pq.is_playing());
        pq.on_platform_idle();
        tokio::time::sleep(Duration::from_millis(20)).await;
        // premature-idle guard means the first idle (arriving well before
        // `expected`) is ignored; the timeout eventually completes it.
        assert_eq!(platform.play_count(), 1);
    }

    #[tokio::test]
    async fn clear_drops_queued_segments() {
        let platform = Arc::new(FakePlatform::new());
        let pq = PlaybackQueue::new(platform.clone());
        pq.enqueue(seg(5_000));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(pq.is_playing());
        pq.enqueue(seg(5_000));
        assert_eq!(pq.len(), 1);
        pq.clear();
        assert_eq!(pq.len(), 0);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!pq.is_playing());
        assert_eq!(platform.stop_count(), 1);
    }
}
