//! Wake-Word / Conversation Gate (C3, spec.md §4.3).

use crate::types::SpeakerId;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How many leading tokens tolerance-scanning for a wake phrase will try,
/// to absorb a filler word before the actual wake phrase ("uh, jarvis...").
const LEADING_TOKEN_SCAN: usize = 5;

pub struct GateDecision {
    pub admit: bool,
    pub cleaned: String,
}

pub struct ConversationGate {
    enabled: bool,
    /// Lowercased, tokenized wake phrases.
    phrases: Vec<Vec<String>>,
    window: Duration,
    last_response: Mutex<HashMap<SpeakerId, Instant>>,
}

impl ConversationGate {
    pub fn new(enabled: bool, phrases: Vec<String>, window: Duration) -> Self {
        let phrases = phrases
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| p.to_lowercase().split_whitespace().map(|s| s.to_string()).collect())
            .collect();
        Self { enabled, phrases, window, last_response: Mutex::new(HashMap::new()) }
    }

    /// §4.3: decide whether `text` from `speaker` is addressed to the
    /// assistant, returning the cleaned (wake-phrase-stripped) transcript.
    pub fn evaluate(&self, speaker: &SpeakerId, text: &str, now: Instant) -> GateDecision {
        if !self.enabled {
            return GateDecision { admit: true, cleaned: text.to_string() };
        }

        if let Some(last) = self.last_response.lock().unwrap().get(speaker) {
            if now.saturating_duration_since(*last) < self.window {
                return GateDecision { admit: true, cleaned: text.to_string() };
            }
        }

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let lower_tokens: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();

        for phrase in &self.phrases {
            if tokens.len() < phrase.len() {
                continue;
            }
            let last_start = (tokens.len() - phrase.len()).min(LEADING_TOKEN_SCAN.saturating_sub(1));
            for start in 0..=last_start {
                let window_matches = lower_tokens[start..start + phrase.len()]
                    .iter()
                    .zip(phrase.iter())
                    .all(|(a, b)| a.trim_matches(|c: char| !c.is_alphanumeric()) == *b);
                if window_matches {
                    let mut remaining: Vec<&str> = Vec::new();
                    remaining.extend_from_slice(&tokens[..start]);
                    remaining.extend_from_slice(&tokens[start + phrase.len()..]);
                    return GateDecision { admit: true, cleaned: remaining.join(" ").trim().to_string() };
                }
            }
        }

        GateDecision { admit: false, cleaned: text.to_string() }
    }

    /// Restart the conversation window for `speaker` (§4.3: called after
    /// any assistant response, including error apologies — see DESIGN.md).
    pub fn mark_assistant_responded(&self, speaker: &SpeakerId) {
        self.last_response.lock().unwrap().insert(speaker.clone(), Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_gate_always_admits() {
        let gate = ConversationGate::new(false, vec![], Duration::from_secs(60));
        let d = gate.evaluate(&"u1".to_string(), "what time is it", Instant::now());
        assert!(d.admit);
        assert_eq!(d.cleaned, "what time is it");
    }

    #[test]
    fn wake_phrase_anchored_at_start_strips_phrase() {
        let gate = ConversationGate::new(true, vec!["jarvis".to_string()], Duration::from_secs(60));
        let d = gate.evaluate(&"u1".to_string(), "Jarvis what time is it", Instant::now());
        assert!(d.admit);
        assert_eq!(d.cleaned, "what time is it");
    }

    #[test]
    fn wake_phrase_tolerates_leading_filler() {
        let gate = ConversationGate::new(true, vec!["jarvis".to_string()], Duration::from_secs(60));
        let d = gate.evaluate(&"u1".to_string(), "uh hey jarvis what time is it", Instant::now());
        assert!(d.admit);
        assert_eq!(d.cleaned, "uh hey what time is it");
    }

    #[test]
    fn no_wake_phrase_rejects() {
        let gate = ConversationGate::new(true, vec!["jarvis".to_string()], Duration::from_secs(60));
        let d = gate.evaluate(&"u1".to_string(), "what time is it", Instant::now());
        assert!(!d.admit);
    }

    #[test]
    fn conversation_window_bypasses_wake_word() {
        let gate = ConversationGate::new(true, vec!["jarvis".to_string()], Duration::from_secs(60));
        gate.mark_assistant_responded(&"u1".to_string());
        let d = gate.evaluate(&"u1".to_string(), "what about tomorrow", Instant::now());
        assert!(d.admit);
        assert_eq!(d.cleaned, "what about tomorrow");
    }
}
