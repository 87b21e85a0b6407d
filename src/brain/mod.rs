//! Brain Client (C6, spec.md §4.6). Streams a reply from the external
//! chat-completions endpoint, emitting complete sentences as they form.

pub mod sentence;

use crate::error::BrainError;
use crate::types::{HistoryEntry, Role};
use futures::StreamExt;
use sentence::SentenceSplitter;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Last-K history entries forwarded on every call (§4.6).
const HISTORY_WINDOW: usize = 6;
const MAX_TOKENS: u32 = 8192;
const WALL_CLOCK_TIMEOUT: Duration = Duration::from_secs(60);

const VOICE_TAG_PREFIX: &str =
    "respond for spoken output; no markdown, bullets, or code blocks; natural conversational speech.";

const ERROR_FALLBACK: &str = "I'm having trouble connecting right now. Try again?";

#[derive(Debug, Clone)]
pub enum BrainOutcome {
    /// The stream completed without being aborted; carries the full raw text.
    Completed(String),
    /// The cancellation token fired before the stream ended.
    Aborted,
    /// Transport/HTTP/timeout failure; carries a short spoken fallback.
    Error(String),
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    user: String,
    stream: bool,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

pub struct BrainClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    model: String,
    session_user: String,
}

impl BrainClient {
    pub fn new(base_url: String, token: String, model: String, session_user: String) -> Self {
        Self { http: reqwest::Client::new(), base_url, token, model, session_user }
    }

    /// Open a streaming connection and emit complete sentences to `on_sentence`
    /// as they form. Returns once the stream ends, is cancelled, or errors.
    pub async fn stream_reply(
        &self,
        transcript: &str,
        history: &[HistoryEntry],
        cancel: CancellationToken,
        mut on_sentence: impl FnMut(String) + Send,
    ) -> BrainOutcome {
        if cancel.is_cancelled() {
            return BrainOutcome::Aborted;
        }

        let mut messages: Vec<ChatMessage> = history
            .iter()
            .rev()
            .take(HISTORY_WINDOW)
            .rev()
            .map(|h| ChatMessage {
                role: match h.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: h.content.clone(),
            })
            .collect();
        messages.push(ChatMessage { role: "user", content: format!("{VOICE_TAG_PREFIX} {transcript}") });

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: MAX_TOKENS,
            user: self.session_user.clone(),
            stream: true,
        };

        let send_fut = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.token)
            .json(&request)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return BrainOutcome::Aborted,
            res = tokio::time::timeout(WALL_CLOCK_TIMEOUT, send_fut) => res,
        };

        let response = match response {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                let err = BrainError::Transport(e.to_string());
                warn!(error = %err, "brain transport error");
                return BrainOutcome::Error(ERROR_FALLBACK.to_string());
            }
            Err(_) => {
                let err = BrainError::Timeout(WALL_CLOCK_TIMEOUT);
                warn!(error = %err, "brain request timed out");
                return BrainOutcome::Error(ERROR_FALLBACK.to_string());
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let err = BrainError::Http { status, body };
            warn!(error = %err, "brain endpoint returned non-2xx");
            return BrainOutcome::Error(ERROR_FALLBACK.to_string());
        }

        let mut stream = response.bytes_stream();
        let mut splitter = SentenceSplitter::new();
        let mut sse_buffer = String::new();

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("brain stream cancelled mid-flight");
                    return BrainOutcome::Aborted;
                }
                next = stream.next() => next,
            };

            let chunk = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => {
                    let err = BrainError::Transport(e.to_string());
                    warn!(error = %err, "brain stream read error");
                    return BrainOutcome::Error(ERROR_FALLBACK.to_string());
                }
                None => break,
            };

            sse_buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = sse_buffer.find("\n\n") {
                let event = sse_buffer[..pos].to_string();
                sse_buffer = sse_buffer[pos + 2..].to_string();

                for line in event.lines() {
                    let Some(data) = line.strip_prefix("data: ") else { continue };
                    if data == "[DONE]" {
                        continue;
                    }
                    if let Ok(parsed) = serde_json::from_str::<StreamChunk>(data) {
                        if let Some(choice) = parsed.choices.first() {
                            if let Some(content) = &choice.delta.content {
                                for sentence in splitter.push(content) {
                                    on_sentence(sentence);
                                }
                            }
                        }
                    }
                }
            }
        }

        if let Some(sentence) = splitter.flush() {
            on_sentence(sentence);
        }

        BrainOutcome::Completed(splitter.full_text_cleaned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_expected_shape() {
        let req = ChatRequest {
            model: "gpt".into(),
            messages: vec![ChatMessage { role: "user", content: "hi".into() }],
            max_tokens: MAX_TOKENS,
            user: "session".into(),
            stream: true,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["model"], "gpt");
        assert_eq!(v["stream"], true);
        assert_eq!(v["messages"][0]["role"], "user");
    }
}
