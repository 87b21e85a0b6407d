//! Deterministic test double for [`super::SttProvider`].

use super::SttProvider;
use crate::error::SttError;
use async_trait::async_trait;

pub struct FakeSttProvider {
    name: String,
    result: Result<String, String>,
}

impl FakeSttProvider {
    pub fn returning(name: &str, text: &str) -> Self {
        Self { name: name.to_string(), result: Ok(text.to_string()) }
    }

    pub fn failing(name: &str) -> Self {
        Self { name: name.to_string(), result: Err("fake provider failure".to_string()) }
    }
}

#[async_trait]
impl SttProvider for FakeSttProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transcribe(&self, _wav: &[u8]) -> Result<String, SttError> {
        self.result.clone().map_err(|message| SttError::Provider { provider: self.name.clone(), message })
    }
}
