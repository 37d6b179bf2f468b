//! Fuzzy matching of schema field names against OCR fragments.
//!
//! Recognition noise mostly damages word endings, so a key word also
//! counts as present when its first few characters are. Fragments whose
//! key words appear in the field's own reading order get a bonus.

use tracing::trace;

use crate::models::config::MatchingConfig;
use crate::models::fragment::TextFragment;

/// The distinctive words of a field name, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyWords {
    words: Vec<String>,
    prefix_len: usize,
}

impl KeyWords {
    /// Split a field name into key words.
    ///
    /// Words with at least `min_len` characters are kept; if none qualify,
    /// every word is kept.
    pub fn from_field_name(field_name: &str, min_len: usize, prefix_len: usize) -> Self {
        let lower = field_name.to_lowercase();
        let all: Vec<String> = lower.split_whitespace().map(str::to_string).collect();
        let long: Vec<String> = all
            .iter()
            .filter(|w| w.chars().count() >= min_len)
            .cloned()
            .collect();

        Self {
            words: if long.is_empty() { all } else { long },
            prefix_len,
        }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn prefix<'w>(&self, word: &'w str) -> Option<&'w str> {
        if self.prefix_len == 0 {
            return None;
        }
        word.char_indices()
            .nth(self.prefix_len)
            .map(|(end, _)| &word[..end])
            .or_else(|| (word.chars().count() == self.prefix_len).then_some(word))
    }

    /// First position of `word` in `text`, falling back to its prefix.
    fn locate(&self, word: &str, text: &str) -> Option<usize> {
        text.find(word)
            .or_else(|| self.prefix(word).and_then(|p| text.find(p)))
    }

    /// Key words present in `text` in full or by prefix.
    pub fn fuzzy_hits(&self, text: &str) -> usize {
        self.words
            .iter()
            .filter(|w| self.locate(w, text).is_some())
            .count()
    }

    /// Fraction of key words contained verbatim in `text`.
    pub fn exact_overlap(&self, text: &str) -> f32 {
        if self.words.is_empty() {
            return 0.0;
        }
        let hits = self.words.iter().filter(|w| text.contains(w.as_str())).count();
        hits as f32 / self.words.len() as f32
    }

    /// Whether every located key word sits after the previous one.
    pub fn in_order(&self, text: &str) -> bool {
        let mut last: Option<usize> = None;
        for word in &self.words {
            if let Some(pos) = self.locate(word, text) {
                if last.is_some_and(|prev| pos <= prev) {
                    return false;
                }
                last = Some(pos);
            }
        }
        true
    }

    /// Start of the rightmost occurrence of any key word or key-word prefix.
    pub fn rightmost_position(&self, text: &str) -> Option<usize> {
        self.words
            .iter()
            .flat_map(|w| [text.rfind(w.as_str()), self.prefix(w).and_then(|p| text.rfind(p))])
            .flatten()
            .max()
    }
}

/// A fragment judged to carry a field's printed label.
#[derive(Debug, Clone, Copy)]
pub struct LabelMatch<'a> {
    pub fragment: &'a TextFragment,
    /// Position of the fragment in the searched slice.
    pub index: usize,
    /// Match quality in `[0, 1 + order_bonus]`.
    pub quality: f32,
}

/// Scores fragments against field names.
#[derive(Debug, Clone, Default)]
pub struct LabelMatcher {
    config: MatchingConfig,
}

impl LabelMatcher {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Key words of `field_name` under this matcher's settings.
    pub fn key_words(&self, field_name: &str) -> KeyWords {
        KeyWords::from_field_name(
            field_name,
            self.config.min_key_word_len,
            self.config.prefix_len,
        )
    }

    /// Match quality of one (already lower-cased) text.
    pub fn quality(&self, key_words: &KeyWords, text: &str) -> f32 {
        if key_words.is_empty() {
            return 0.0;
        }

        let hits = key_words.fuzzy_hits(text);
        let mut quality = hits as f32 / key_words.words().len() as f32;

        if hits > 0 && key_words.in_order(text) {
            quality += self.config.order_bonus;
        }

        quality
    }

    /// Fragments matching `field_name`, best first.
    ///
    /// Only fragments at or above the minimum match quality are returned.
    /// Equal qualities keep the order of `fragments`.
    pub fn rank<'a>(&self, field_name: &str, fragments: &'a [TextFragment]) -> Vec<LabelMatch<'a>> {
        let key_words = self.key_words(field_name);

        let mut matches: Vec<LabelMatch<'a>> = fragments
            .iter()
            .enumerate()
            .filter_map(|(index, fragment)| {
                let quality = self.quality(&key_words, &fragment.text().to_lowercase());
                (quality >= self.config.min_match_quality).then_some(LabelMatch {
                    fragment,
                    index,
                    quality,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.quality.total_cmp(&a.quality));

        trace!(
            "Field '{}': {} label candidates (key words {:?})",
            field_name,
            matches.len(),
            key_words.words()
        );

        matches
    }

    /// Best-matching fragment for `field_name`, first in order on ties.
    pub fn best<'a>(&self, field_name: &str, fragments: &'a [TextFragment]) -> Option<LabelMatch<'a>> {
        self.rank(field_name, fragments).into_iter().next()
    }
}
