//! Generic HTTP TTS provider (§6.3, SPEC_FULL §C): POSTs text to a
//! configured endpoint and expects raw audio bytes back. As with
//! [`crate::stt::http`], any specific vendor wire format is out of scope
//! (§1); this is the narrow shape any such vendor can be adapted to.

use super::TtsProvider;
use crate::error::TtsError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
}

pub struct HttpTtsProvider {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpTtsProvider {
    pub fn new(url: String, api_key: String) -> Self {
        Self { http: reqwest::Client::new(), url, api_key }
    }
}

#[async_trait]
impl TtsProvider for HttpTtsProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        let resp = tokio::time::timeout(
            REQUEST_TIMEOUT,
            self.http.post(&self.url).bearer_auth(&self.api_key).json(&SynthesizeRequest { text }).send(),
        )
        .await
        .map_err(|_| TtsError::Timeout { provider: "http".into() })?
        .map_err(|e| TtsError::Provider { provider: "http".into(), message: e.to_string() })?;

        if !resp.status().is_success() {
            return Err(TtsError::Provider {
                provider: "http".into(),
                message: format!("status {}", resp.status()),
            });
        }

        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| TtsError::Provider { provider: "http".into(), message: e.to_string() })
    }
}
