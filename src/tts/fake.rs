//! Deterministic test double for [`super::TtsProvider`].

use super::TtsProvider;
use crate::error::TtsError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub struct FakeTtsProvider {
    name: String,
    succeed: bool,
    pub call_count: Arc<Mutex<u32>>,
}

impl FakeTtsProvider {
    pub fn succeeding(name: &str) -> Self {
        Self { name: name.to_string(), succeed: true, call_count: Arc::new(Mutex::new(0)) }
    }

    pub fn failing(name: &str) -> Self {
        Self { name: name.to_string(), succeed: false, call_count: Arc::new(Mutex::new(0)) }
    }
}

#[async_trait]
impl TtsProvider for FakeTtsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        *self.call_count.lock().unwrap() += 1;
        if self.succeed {
            Ok(text.as_bytes().to_vec())
        } else {
            Err(TtsError::Provider { provider: self.name.clone(), message: "fake failure".into() })
        }
    }
}
