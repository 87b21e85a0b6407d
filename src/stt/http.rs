//! Generic HTTP STT provider (§6.2, SPEC_FULL §C): POSTs a WAV blob to a
//! configured endpoint and expects a JSON `{text: string}` response. The
//! wire format of any specific vendor is out of scope (§1); this is the
//! narrow shape any such vendor can be adapted to.

use super::SttProvider;
use crate::error::SttError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct TranscribeResponse {
    text: String,
}

pub struct HttpSttProvider {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpSttProvider {
    pub fn new(url: String, api_key: String) -> Self {
        Self { http: reqwest::Client::new(), url, api_key }
    }
}

#[async_trait]
impl SttProvider for HttpSttProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn transcribe(&self, wav: &[u8]) -> Result<String, SttError> {
        let resp = tokio::time::timeout(
            REQUEST_TIMEOUT,
            self.http
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .header("content-type", "audio/wav")
                .body(wav.to_vec())
                .send(),
        )
        .await
        .map_err(|_| SttError::Timeout { provider: "http".into() })?
        .map_err(|e| SttError::Provider { provider: "http".into(), message: e.to_string() })?;

        if !resp.status().is_success() {
            return Err(SttError::Provider {
                provider: "http".into(),
                message: format!("status {}", resp.status()),
            });
        }

        let parsed: TranscribeResponse = resp
            .json()
            .await
            .map_err(|e| SttError::Provider { provider: "http".into(), message: e.to_string() })?;
        Ok(parsed.text)
    }
}
