//! Wake phrase detection on recognized text
//!
//! Matching is a case-insensitive substring search. Phrases are tried in
//! the order they were configured and the first phrase present anywhere in
//! the utterance wins, at its first occurrence.

use tracing::debug;

/// Characters stripped from around the command that follows a wake phrase
const REMAINDER_TRIM: &[char] = &[',', '.', '!', '?', ';', ':'];

/// A wake phrase found in an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeMatch {
    /// The configured phrase that matched (normalized)
    pub phrase: String,
    /// Text following the phrase, trimmed; empty when nothing follows
    pub command: String,
}

/// Detects configured wake phrases in recognized text
#[derive(Debug, Clone)]
pub struct WakeWordDetector {
    phrases: Vec<String>,
}

impl WakeWordDetector {
    /// Create a detector; phrases are trimmed and lowercased, blanks dropped
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        Self { phrases }
    }

    /// Configured phrases in priority order
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Look for a wake phrase in `text`
    pub fn detect(&self, text: &str) -> Option<WakeMatch> {
        let folded = Folded::new(text);

        for phrase in &self.phrases {
            let Some(start) = folded.lower.find(phrase.as_str()) else {
                continue;
            };
            let end = start + phrase.len();

            // Keep the original casing when the phrase ends on a character
            // boundary of the source text
            let tail = match folded.original_offset(end) {
                Some(offset) => &text[offset..],
                None => &folded.lower[end..],
            };

            let command = tail
                .trim()
                .trim_matches(|c: char| REMAINDER_TRIM.contains(&c) || c.is_whitespace())
                .to_string();

            debug!("Wake phrase '{}' matched, command: '{}'", phrase, command);
            return Some(WakeMatch {
                phrase: phrase.clone(),
                command,
            });
        }

        None
    }
}

/// Lowercased text with the offsets of each source character in both strings
struct Folded {
    lower: String,
    /// `(lowercase offset, source offset)` at every source char start, plus the ends
    boundaries: Vec<(usize, usize)>,
}

impl Folded {
    fn new(text: &str) -> Self {
        let mut lower = String::with_capacity(text.len());
        let mut boundaries = Vec::with_capacity(text.len() + 1);

        for (offset, c) in text.char_indices() {
            boundaries.push((lower.len(), offset));
            lower.extend(c.to_lowercase());
        }
        boundaries.push((lower.len(), text.len()));

        Self { lower, boundaries }
    }

    /// Source offset for a lowercase offset, if it starts a source character
    fn original_offset(&self, lower_offset: usize) -> Option<usize> {
        self.boundaries
            .binary_search_by_key(&lower_offset, |&(lower, _)| lower)
            .ok()
            .map(|index| self.boundaries[index].1)
    }
}

impl Default for WakeWordDetector {
    fn default() -> Self {
        Self::new(["hey jarvis", "hello jarvis"])
    }
}
