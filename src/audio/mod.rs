//! Audio Segmenter (C1, spec.md §4.1). Turns per-speaker decoded PCM frames
//! into a completed [`Utterance`] on silence, and runs the barge-in timer
//! that clears the playback queue when the user talks over the assistant.
//!
//! Opus decoding and the silence-window decision that produces
//! `speaking-end` are the voice platform's responsibility (§1 Out of
//! scope); this module consumes already-decoded PCM and a `speaking-end`
//! event as its silence signal.

use crate::platform::PlatformEvent;
use crate::playback::PlaybackQueue;
use crate::types::{SpeakerId, Utterance};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    pub allowed_users: HashSet<SpeakerId>,
    /// D_min: discard buffers shorter than this.
    pub min_duration: Duration,
    /// RMS floor on a ±32768 scale.
    pub rms_floor: f64,
    /// D_barge: sustained speech required to treat as barge-in.
    pub barge_in_delay: Duration,
    /// Downsample 48 kHz mono PCM to 16 kHz by 3:1 block averaging before emitting.
    pub downsample_to_16k: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            allowed_users: HashSet::new(),
            min_duration: Duration::from_millis(300),
            rms_floor: 500.0,
            barge_in_delay: Duration::from_millis(600),
            downsample_to_16k: false,
        }
    }
}

struct SpeakerBuffer {
    pcm: Vec<i16>,
    sample_rate_hz: u32,
    captured_at: SystemTime,
}

pub struct AudioSegmenter {
    config: SegmenterConfig,
    playback: Arc<PlaybackQueue>,
}

impl AudioSegmenter {
    pub fn new(config: SegmenterConfig, playback: Arc<PlaybackQueue>) -> Self {
        Self { config, playback }
    }

    /// Drive the segmenter off the platform's event stream, emitting
    /// completed utterances onto `utterances_tx`. Runs until the event
    /// stream closes.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<PlatformEvent>,
        utterances_tx: mpsc::Sender<Utterance>,
    ) {
        let mut buffers: HashMap<SpeakerId, SpeakerBuffer> = HashMap::new();
        let mut barge_timers: HashMap<SpeakerId, (JoinHandle<()>, Arc<AtomicBool>)> = HashMap::new();

        while let Some(event) = events.recv().await {
            match event {
                PlatformEvent::Ready => {
                    // Reconnect: stale buffers and barge-in timers no longer apply.
                    for (_, (handle, _)) in barge_timers.drain() {
                        handle.abort();
                    }
                    buffers.clear();
                }
                PlatformEvent::SpeakingStart { speaker } => {
                    if !self.config.allowed_users.contains(&speaker) {
                        continue;
                    }
                    buffers.insert(
                        speaker.clone(),
                        SpeakerBuffer { pcm: Vec::new(), sample_rate_hz: 48_000, captured_at: SystemTime::now() },
                    );

                    if let Some((handle, _)) = barge_timers.remove(&speaker) {
                        handle.abort();
                    }
                    if self.playback.is_playing() {
                        let still_speaking = Arc::new(AtomicBool::new(true));
                        let flag = still_speaking.clone();
                        let playback = self.playback.clone();
                        let delay = self.config.barge_in_delay;
                        let spk = speaker.clone();
                        let handle = tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            if flag.load(Ordering::SeqCst) {
                                debug!(speaker = %spk, "sustained barge-in, clearing playback");
                                playback.clear_for_barge_in();
                            }
                        });
                        barge_timers.insert(speaker, (handle, still_speaking));
                    }
                }
                PlatformEvent::SpeakingEnd { speaker } => {
                    if let Some((handle, flag)) = barge_timers.remove(&speaker) {
                        flag.store(false, Ordering::SeqCst);
                        handle.abort();
                    }
                    if let Some(buf) = buffers.remove(&speaker) {
                        self.finalize(speaker, buf, &utterances_tx).await;
                    }
                }
                PlatformEvent::OpusFrame { speaker, pcm, sample_rate_hz } => {
                    if let Some(buf) = buffers.get_mut(&speaker) {
                        buf.sample_rate_hz = sample_rate_hz;
                        buf.pcm.extend_from_slice(&pcm);
                    }
                    // Individual frame decode errors never reach this event
                    // stream (handled upstream); nothing to drop here.
                }
                PlatformEvent::Presence { .. } | PlatformEvent::PlaybackIdle => {
                    // Handled by C9/C8 respectively; not this module's concern.
                }
                PlatformEvent::Disconnected { reason } => {
                    info!(%reason, "voice platform disconnected, clearing speaker state");
                    for (_, (handle, _)) in barge_timers.drain() {
                        handle.abort();
                    }
                    buffers.clear();
                }
            }
        }
    }

    async fn finalize(&self, speaker: SpeakerId, buf: SpeakerBuffer, tx: &mpsc::Sender<Utterance>) {
        let duration = pcm_duration(buf.pcm.len(), buf.sample_rate_hz);
        if duration < self.config.min_duration {
            debug!(speaker = %speaker, ?duration, "utterance too short, discarding");
            return;
        }

        let utterance = Utterance {
            speaker: speaker.clone(),
            pcm: buf.pcm,
            sample_rate_hz: buf.sample_rate_hz,
            captured_at: buf.captured_at,
            duration,
        };

        if utterance.rms() < self.config.rms_floor {
            debug!(speaker = %speaker, rms = utterance.rms(), "utterance below rms floor, discarding");
            return;
        }

        let utterance = if self.config.downsample_to_16k && utterance.sample_rate_hz == 48_000 {
            downsample_3to1(utterance)
        } else {
            utterance
        };

        if tx.send(utterance).await.is_err() {
            debug!("utterance receiver dropped");
        }
    }
}

fn pcm_duration(samples: usize, sample_rate_hz: u32) -> Duration {
    if sample_rate_hz == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(samples as f64 / sample_rate_hz as f64)
}

/// 3:1 block-averaging downsample (48 kHz -> 16 kHz).
fn downsample_3to1(mut u: Utterance) -> Utterance {
    let out: Vec<i16> = u
        .pcm
        .chunks(3)
        .map(|chunk| {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            (sum / chunk.len() as i32) as i16
        })
        .collect();
    u.pcm = out;
    u.sample_rate_hz = 16_000;
    u
}
