//! Linking a label fragment to the handwritten count on its right.
//!
//! Cards print several labels per line, so the nearest `=NUMBER` to the
//! right of a label may belong to a different field. A candidate count is
//! blocked when another field's label sits between it and the anchor.

use tracing::trace;

use crate::models::config::MatchingConfig;
use crate::models::fragment::TextFragment;

use super::count::extract_embedded;
use super::matcher::KeyWords;

/// Where each schema field's label appears in one fragment set.
///
/// Built once per extraction call and shared by every field lookup.
#[derive(Debug, Clone, Default)]
pub struct BlockerIndex {
    entries: Vec<BlockerEntry>,
}

#[derive(Debug, Clone)]
struct BlockerEntry {
    field_name: String,
    /// `(x_min, y_min)` of every fragment matching the field strongly enough.
    positions: Vec<(f32, f32)>,
}

impl BlockerIndex {
    /// Index the label positions of `field_names` among `fragments`.
    pub fn build(field_names: &[&str], fragments: &[TextFragment], config: &MatchingConfig) -> Self {
        let lowered: Vec<String> = fragments.iter().map(|f| f.text().to_lowercase()).collect();

        let entries = field_names
            .iter()
            .map(|name| {
                let key_words =
                    KeyWords::from_field_name(name, config.min_key_word_len, config.prefix_len);
                let positions = fragments
                    .iter()
                    .zip(&lowered)
                    .filter(|(_, text)| key_words.exact_overlap(text) >= config.block_min_quality)
                    .map(|(fragment, _)| (fragment.x(), fragment.y()))
                    .collect();
                BlockerEntry {
                    field_name: (*name).to_string(),
                    positions,
                }
            })
            .collect();

        Self { entries }
    }

    /// Label positions of every field except `own_field`.
    fn positions_excluding<'a>(&'a self, own_field: &'a str) -> impl Iterator<Item = (f32, f32)> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.field_name != own_field)
            .flat_map(|e| e.positions.iter().copied())
    }
}

/// A count linked to a label.
#[derive(Debug, Clone, Copy)]
pub struct LinkedCount<'a> {
    pub value: u32,
    /// OCR confidence of the count fragment.
    pub confidence: f32,
    pub fragment: &'a TextFragment,
    /// Horizontal distance from the label's left edge.
    pub dx: f32,
}

/// Finds same-line counts to the right of a label.
#[derive(Debug, Clone, Default)]
pub struct SpatialLinker {
    config: MatchingConfig,
}

impl SpatialLinker {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Nearest unblocked `=NUMBER` fragment to the right of `label` on the same line.
    pub fn find_nearest_right_count<'a>(
        &self,
        label: &TextFragment,
        fragments: &'a [TextFragment],
        blockers: &BlockerIndex,
        own_field: &str,
    ) -> Option<LinkedCount<'a>> {
        let mut best: Option<LinkedCount<'a>> = None;

        for candidate in fragments {
            let Some(value) = extract_embedded(candidate.text()) else {
                continue;
            };

            let dx = candidate.x() - label.x();
            let dy = (candidate.y() - label.y()).abs();
            if !(dx > 0.0 && dx < self.config.max_dx && dy < self.config.max_dy) {
                continue;
            }

            if self.is_blocked(label, candidate, blockers, own_field) {
                trace!(
                    "Count '{}' for '{}' blocked by another label",
                    candidate.text(),
                    own_field
                );
                continue;
            }

            if best.is_none_or(|b| dx < b.dx) {
                best = Some(LinkedCount {
                    value,
                    confidence: candidate.confidence(),
                    fragment: candidate,
                    dx,
                });
            }
        }

        best
    }

    fn is_blocked(
        &self,
        label: &TextFragment,
        candidate: &TextFragment,
        blockers: &BlockerIndex,
        own_field: &str,
    ) -> bool {
        let left = label.x() + self.config.block_margin_x;
        let right = candidate.x() - self.config.block_margin_x;

        blockers.positions_excluding(own_field).any(|(x, y)| {
            left < x && x < right && (y - label.y()).abs() < self.config.block_max_dy
        })
    }
}
