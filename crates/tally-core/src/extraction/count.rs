//! Extraction of `=NUMBER` counts from fragment text.

use super::matcher::KeyWords;
use super::patterns::COUNT_PATTERN;

/// A count found inside a text, with the byte offset where its match starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedCount {
    pub value: u32,
    pub start: usize,
}

/// First `=NUMBER` match in `text`.
///
/// A digit run too large for `u32` is treated as no match.
pub fn find_count(text: &str) -> Option<EmbeddedCount> {
    let caps = COUNT_PATTERN.captures(text)?;
    let start = caps.get(0)?.start();
    let value = caps[1].parse().ok()?;
    Some(EmbeddedCount { value, start })
}

/// Count embedded anywhere in `text`.
pub fn extract_embedded(text: &str) -> Option<u32> {
    find_count(text).map(|c| c.value)
}

/// Count embedded in a label fragment, accepted only after the label itself.
///
/// "Plastic bottles =12" yields 12; "=3 Plastic bottles" yields nothing
/// because the count precedes the rightmost key word.
pub fn extract_embedded_after_label(text: &str, key_words: &KeyWords) -> Option<u32> {
    let lower = text.to_lowercase();
    let count = find_count(&lower)?;

    match key_words.rightmost_position(&lower) {
        Some(label_pos) if count.start <= label_pos => None,
        _ => Some(count.value),
    }
}
