//! Deterministic test double for [`super::VoicePlatform`].

use super::{PlatformEvent, VoicePlatform};
use crate::error::PlatformError;
use crate::types::AudioSegment;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A fake platform whose event stream is driven by the test via `inject`.
/// Records every `play`/`stop`/`post_text` call for assertions.
pub struct FakePlatform {
    inject_rx: Mutex<Option<mpsc::Receiver<PlatformEvent>>>,
    pub injector: mpsc::Sender<PlatformEvent>,
    pub played: Mutex<Vec<AudioSegment>>,
    pub stops: Mutex<u32>,
    pub posts: Mutex<Vec<(Option<String>, String)>>,
    pub fail_connect: Mutex<bool>,
}

impl FakePlatform {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(256);
        Self {
            inject_rx: Mutex::new(Some(rx)),
            injector: tx,
            played: Mutex::new(Vec::new()),
            stops: Mutex::new(0),
            posts: Mutex::new(Vec::new()),
            fail_connect: Mutex::new(false),
        }
    }

    pub fn play_count(&self) -> usize {
        self.played.lock().unwrap().len()
    }

    pub fn stop_count(&self) -> u32 {
        *self.stops.lock().unwrap()
    }
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoicePlatform for FakePlatform {
    async fn connect(&self) -> Result<mpsc::Receiver<PlatformEvent>, PlatformError> {
        if *self.fail_connect.lock().unwrap() {
            return Err(PlatformError::JoinFailed("fake connect failure".into()));
        }
        self.inject_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| PlatformError::JoinFailed("fake already connected".into()))
    }

    async fn play(&self, segment: &AudioSegment) -> Result<(), PlatformError> {
        self.played.lock().unwrap().push(segment.clone());
        Ok(())
    }

    async fn stop(&self) -> Result<(), PlatformError> {
        *self.stops.lock().unwrap() += 1;
        Ok(())
    }

    async fn post_text(&self, user: Option<&str>, text: &str) -> Result<(), PlatformError> {
        self.posts
            .lock()
            .unwrap()
            .push((user.map(|s| s.to_string()), text.to_string()));
        Ok(())
    }
}
