//! Command Router (C4, spec.md §4.4). Identifies interrupt/stop commands
//! and the wake-only ("listening acknowledgment") fast path before a
//! transcript would otherwise be dispatched to the brain.

use regex::Regex;
use std::sync::LazyLock;

/// Whole-transcript stop patterns (case-insensitive, optionally preceded by
/// a wake word which the gate has already stripped). Anchored so that a
/// long sentence merely containing "stop" does not match.
static STOP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^stop$",
        r"^cancel$",
        r"^stop\s+talking$",
        r"^that'?s\s+enough$",
        r"^hold\s+on$",
        r"^wait$",
        r"^never\s?mind$",
        r"^quiet$",
        r"^shut\s+up$",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("static stop pattern is valid"))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Interrupt command: cancel all tasks, clear playback, speak a confirmation.
    Stop,
    /// Empty or trivially short after wake-word stripping: play a chime, open the window.
    WakeOnly,
    /// Proceed to dispatch with this (possibly further-trimmed) transcript.
    Dispatch,
}

/// Minimum non-punctuation character count below which a cleaned
/// transcript is treated as a bare wake acknowledgment (§4.4).
const WAKE_ONLY_MIN_CHARS: usize = 2;

pub fn route(cleaned_transcript: &str) -> RouteDecision {
    let trimmed = cleaned_transcript.trim().trim_end_matches(|c: char| ".,!?".contains(c));
    let trimmed = trimmed.trim();

    if STOP_PATTERNS.iter().any(|re| re.is_match(trimmed)) {
        return RouteDecision::Stop;
    }

    let meaningful_chars = trimmed.chars().filter(|c| c.is_alphanumeric()).count();
    if meaningful_chars < WAKE_ONLY_MIN_CHARS {
        return RouteDecision::WakeOnly;
    }

    RouteDecision::Dispatch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_stop_matches() {
        assert_eq!(route("stop"), RouteDecision::Stop);
        assert_eq!(route("Stop."), RouteDecision::Stop);
        assert_eq!(route("  STOP  "), RouteDecision::Stop);
        assert_eq!(route("stop talking"), RouteDecision::Stop);
        assert_eq!(route("that's enough"), RouteDecision::Stop);
        assert_eq!(route("hold on"), RouteDecision::Stop);
    }

    #[test]
    fn long_sentence_containing_stop_is_not_a_command() {
        assert_eq!(route("please stop and think about this carefully"), RouteDecision::Dispatch);
    }

    #[test]
    fn empty_after_wake_strip_is_wake_only() {
        assert_eq!(route(""), RouteDecision::WakeOnly);
        assert_eq!(route("."), RouteDecision::WakeOnly);
        assert_eq!(route("a"), RouteDecision::WakeOnly);
    }

    #[test]
    fn normal_question_dispatches() {
        assert_eq!(route("what time is it"), RouteDecision::Dispatch);
    }
}
