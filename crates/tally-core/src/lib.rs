//! Core library for data-card OCR processing.
//!
//! This crate provides:
//! - Fragment, schema, and result models for one card image
//! - Fuzzy label matching tolerant of OCR noise
//! - `=NUMBER` count extraction and same-line spatial linking
//! - Field resolution over a whole form schema
//! - Review validation of extracted counts
//! - OCR oracle adapters (PaddleOCR JSON, optional native engine)

pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod validation;

pub use error::{ExtractionError, FragmentError, OcrError, Result, TallyError};
pub use extraction::{FieldResolver, LabelMatch, LabelMatcher, LinkedCount, SpatialLinker};
pub use models::config::{MatchingConfig, OcrConfig, TallyConfig, ValidationConfig};
pub use models::fragment::{BoundingBox, TextFragment};
pub use models::result::{CategoryResult, FieldOutcome, FieldResult, FormResult};
pub use models::schema::{CategorySchema, FieldSchema, FormSchema};
pub use ocr::{CardReader, CardReading, FixedFragments, FragmentSource};
pub use validation::{FieldStatus, ValidatedCategory, ValidatedField, ValidatedForm};

#[cfg(feature = "native")]
pub use ocr::PureOcrSource;
