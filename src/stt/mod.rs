//! Transcriber (C2, spec.md §4.2). Converts a PCM utterance to a WAV blob,
//! cascades through configured STT providers until one succeeds, and
//! applies a vocabulary-correction post-pass.

pub mod fake;
pub mod http;

use crate::error::SttError;
use crate::types::{Transcript, Utterance};
use async_trait::async_trait;
use std::collections::HashMap;

/// `transcribe(wavBlob) -> string` (§6.2). Returns possibly-empty text or fails.
#[async_trait]
pub trait SttProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn transcribe(&self, wav: &[u8]) -> Result<String, SttError>;
}

pub struct Transcriber {
    providers: Vec<Box<dyn SttProvider>>,
    vocab_corrections: HashMap<String, String>,
}

impl Transcriber {
    pub fn new(providers: Vec<Box<dyn SttProvider>>, vocab_corrections: HashMap<String, String>) -> Self {
        Self { providers, vocab_corrections }
    }

    /// Returns `None` when the utterance yields no meaningful transcript
    /// (all providers failed, or the result was empty/whitespace).
    pub async fn transcribe(&self, utterance: &Utterance) -> Option<Transcript> {
        let wav = pcm_to_wav(utterance);
        let mut text = None;
        for provider in &self.providers {
            match provider.transcribe(&wav).await {
                Ok(t) => {
                    text = Some(t);
                    break;
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "stt provider failed, trying next");
                }
            }
        }

        let text = text?;
        let corrected = apply_vocab_corrections(&text, &self.vocab_corrections);
        if corrected.trim().is_empty() {
            return None;
        }
        Some(Transcript { speaker: utterance.speaker.clone(), text: corrected })
    }
}

fn apply_vocab_corrections(text: &str, table: &HashMap<String, String>) -> String {
    if table.is_empty() {
        return text.to_string();
    }
    text.split_inclusive(char::is_whitespace)
        .map(|token| {
            let (word, trailing_ws) = split_trailing_whitespace(token);
            match table.get(&word.to_lowercase()) {
                Some(replacement) => format!("{replacement}{trailing_ws}"),
                None => token.to_string(),
            }
        })
        .collect()
}

fn split_trailing_whitespace(token: &str) -> (&str, &str) {
    let trim_end = token.trim_end_matches(char::is_whitespace);
    (trim_end, &token[trim_end.len()..])
}

/// Minimal 16-bit PCM WAV encoder — this subsystem's only interface to STT
/// providers is the WAV blob (§6.2); no playback of this format is needed.
pub fn pcm_to_wav(utterance: &Utterance) -> Vec<u8> {
    let data_len = utterance.pcm.len() * 2;
    let mut out = Vec::with_capacity(44 + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + data_len) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&utterance.sample_rate_hz.to_le_bytes());
    let byte_rate = utterance.sample_rate_hz * 2;
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());
    for sample in &utterance.pcm {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::FakeSttProvider;
    use std::time::{Duration, SystemTime};

    fn utterance(text_hint: &str) -> Utterance {
        let _ = text_hint;
        Utterance {
            speaker: "u1".into(),
            pcm: vec![1000; 4800],
            sample_rate_hz: 48_000,
            captured_at: SystemTime::now(),
            duration: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn cascades_to_next_provider_on_failure() {
        let failing = FakeSttProvider::failing("bad");
        let working = FakeSttProvider::returning("good", "hello jarvis");
        let t = Transcriber::new(vec![Box::new(failing), Box::new(working)], HashMap::new());
        let transcript = t.transcribe(&utterance("x")).await.unwrap();
        assert_eq!(transcript.text, "hello jarvis");
    }

    #[tokio::test]
    async fn empty_result_drops_utterance() {
        let blank = FakeSttProvider::returning("blank", "   ");
        let t = Transcriber::new(vec![Box::new(blank)], HashMap::new());
        assert!(t.transcribe(&utterance("x")).await.is_none());
    }

    #[tokio::test]
    async fn vocab_correction_applies_case_insensitively() {
        let mut table = HashMap::new();
        table.insert("jarviss".to_string(), "Jarvis".to_string());
        let p = FakeSttProvider::returning("p", "hey JARVISS how are you");
        let t = Transcriber::new(vec![Box::new(p)], table);
        let transcript = t.transcribe(&utterance("x")).await.unwrap();
        assert_eq!(transcript.text, "hey Jarvis how are you");
    }

    #[test]
    fn wav_header_has_expected_size_field() {
        let u = utterance("x");
        let wav = pcm_to_wav(&u);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
    }
}
