//! Error types for the tally-core library.

use thiserror::Error;

/// Main error type for the tally library.
#[derive(Error, Debug)]
pub enum TallyError {
    /// Invalid OCR fragment.
    #[error("fragment error: {0}")]
    Fragment(#[from] FragmentError),

    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised when an OCR fragment violates its contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FragmentError {
    /// A box coordinate is NaN or infinite.
    #[error("bounding box has a non-finite coordinate: {0:?}")]
    NonFiniteCoordinate([f32; 4]),

    /// The box has min greater than max on some axis.
    #[error("bounding box is inverted: {0:?}")]
    InvertedBox([f32; 4]),

    /// Confidence is NaN or outside [0, 1].
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f32),
}

/// Errors related to form field extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// A category has an empty or blank name.
    #[error("category #{0} has an empty name")]
    EmptyCategoryName(usize),

    /// The same category appears twice in the schema.
    #[error("duplicate category: {0}")]
    DuplicateCategory(String),

    /// A field has an empty or blank name.
    #[error("category {category} has a field with an empty name")]
    EmptyFieldName { category: String },

    /// The same field appears twice within one category.
    #[error("duplicate field {field} in category {category}")]
    DuplicateField { category: String, field: String },

    /// A field result has a value without a confidence, or the reverse.
    #[error("field result must carry both value and confidence, or neither")]
    UnpairedResult,
}

/// Errors related to the OCR oracle.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text detection or recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// OCR output could not be converted into fragments.
    #[error("malformed OCR output: {0}")]
    MalformedOutput(String),

    /// A recognized fragment failed validation.
    #[error("invalid fragment #{index}: {source}")]
    InvalidFragment {
        index: usize,
        #[source]
        source: FragmentError,
    },
}

/// Result type for the tally library.
pub type Result<T> = std::result::Result<T, TallyError>;
