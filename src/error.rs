//! Structured, subsystem-scoped errors (SPEC_FULL §A.2). Call sites wrap
//! these in `anyhow::Result` and add context; subsystem internals return
//! these concrete types so callers can match on failure kind where it
//! matters (e.g. the STT/TTS/brain provider cascades).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SttError {
    #[error("stt provider {provider} returned an error: {message}")]
    Provider { provider: String, message: String },
    #[error("stt request to {provider} timed out")]
    Timeout { provider: String },
}

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("tts provider {provider} returned an error: {message}")]
    Provider { provider: String, message: String },
    #[error("tts request to {provider} timed out")]
    Timeout { provider: String },
}

#[derive(Debug, Error)]
pub enum BrainError {
    #[error("brain endpoint returned status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("brain request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("brain request transport error: {0}")]
    Transport(String),
    #[error("brain task was cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("voice platform disconnected: {0}")]
    Disconnected(String),
    #[error("voice channel not found: {0}")]
    ChannelNotFound(String),
    #[error("failed to join voice channel: {0}")]
    JoinFailed(String),
}
