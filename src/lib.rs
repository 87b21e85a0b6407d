//! Core of a real-time voice assistant bridge.
//!
//! Captures per-speaker audio from a voice-platform client, transcribes it,
//! dispatches the transcript to an external chat-completions "brain", and
//! speaks the reply back through a single serialized playback queue. See
//! `SPEC_FULL.md` at the repository root for the full component breakdown.

pub mod alerts;
pub mod audio;
pub mod brain;
pub mod config;
pub mod error;
pub mod gate;
pub mod handoff;
pub mod metrics;
pub mod platform;
pub mod playback;
pub mod router;
pub mod session;
pub mod stt;
pub mod tasks;
pub mod tts;
pub mod types;

pub use session::Session;
