//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the tally pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Label matching and count linking thresholds.
    pub matching: MatchingConfig,

    /// OCR oracle configuration.
    pub ocr: OcrConfig,

    /// Review validation configuration.
    pub validation: ValidationConfig,
}

/// Thresholds for the label matcher and the spatial linker.
///
/// Pixel distances are calibrated for images whose longer side is
/// `calibrated_max_dimension`; use [`MatchingConfig::scaled_for`] when
/// images are resized to a different bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum label match quality for a fragment to count as a label.
    pub min_match_quality: f32,

    /// Bonus added when key words appear in schema order.
    pub order_bonus: f32,

    /// Words at least this long (in characters) are key words.
    pub min_key_word_len: usize,

    /// Prefix length used to tolerate OCR errors in word suffixes.
    pub prefix_len: usize,

    /// Minimum key-word overlap for another field's label to block a count.
    pub block_min_quality: f32,

    /// Maximum horizontal distance from label to count (exclusive).
    pub max_dx: f32,

    /// Maximum vertical offset between label and count (exclusive).
    pub max_dy: f32,

    /// Horizontal margin a blocking label must keep from both ends.
    pub block_margin_x: f32,

    /// Maximum vertical offset of a blocking label (exclusive).
    pub block_max_dy: f32,

    /// Longer image side the pixel thresholds were tuned for.
    pub calibrated_max_dimension: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_match_quality: 0.5,
            order_bonus: 0.5,
            min_key_word_len: 4,
            prefix_len: 4,
            block_min_quality: 0.7,
            max_dx: 400.0,
            max_dy: 18.0,
            block_margin_x: 30.0,
            block_max_dy: 15.0,
            calibrated_max_dimension: 1296,
        }
    }
}

impl MatchingConfig {
    /// Rescale pixel thresholds for images bounded by `max_dimension`.
    ///
    /// A bound of 0 means images are not resized, so the calibrated
    /// thresholds are kept.
    pub fn scaled_for(&self, max_dimension: u32) -> Self {
        if self.calibrated_max_dimension == 0
            || max_dimension == 0
            || max_dimension == self.calibrated_max_dimension
        {
            return self.clone();
        }

        let factor = max_dimension as f32 / self.calibrated_max_dimension as f32;
        Self {
            max_dx: self.max_dx * factor,
            max_dy: self.max_dy * factor,
            block_margin_x: self.block_margin_x * factor,
            block_max_dy: self.block_max_dy * factor,
            calibrated_max_dimension: max_dimension,
            ..self.clone()
        }
    }
}

/// OCR oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Maximum image dimension (longer side) before recognition.
    pub max_image_size: u32,

    /// Fragments recognized below this confidence are dropped.
    pub min_fragment_confidence: f32,

    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            max_image_size: 1296,
            min_fragment_confidence: 0.0,
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

/// Review validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Counts read with at least this confidence need no human review.
    pub confident_threshold: f32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            confident_threshold: 0.95,
        }
    }
}

impl TallyConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Matching thresholds rescaled to the configured OCR image bound.
    pub fn effective_matching(&self) -> MatchingConfig {
        self.matching.scaled_for(self.ocr.max_image_size)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.ocr.model_dir.join(model_name)
    }
}
