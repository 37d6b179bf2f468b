//! OCR boundary: fragment sources and the card reading pipeline.
//!
//! The extraction core never runs OCR itself. A [`FragmentSource`] turns an
//! image into fragments; [`CardReader`] normalizes the image, calls the
//! source and resolves the schema, turning OCR failures into an explicit
//! all-absent reading instead of an error.

mod paddle;
mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;

pub use paddle::{fragments_from_json, fragments_from_paddle};
pub use preprocessing::resize_to_max_dimension;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrSource;

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, OcrError};
use crate::extraction::FieldResolver;
use crate::models::config::TallyConfig;
use crate::models::fragment::TextFragment;
use crate::models::result::FormResult;
use crate::models::schema::FormSchema;

/// Anything that can turn a card image into text fragments.
pub trait FragmentSource {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextFragment>, OcrError>;
}

/// Source returning a fixed fragment list regardless of the image.
#[derive(Debug, Clone, Default)]
pub struct FixedFragments {
    fragments: Vec<TextFragment>,
    failure: Option<String>,
}

impl FixedFragments {
    pub fn new(fragments: Vec<TextFragment>) -> Self {
        Self {
            fragments,
            failure: None,
        }
    }

    /// Source whose every recognition fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fragments: Vec::new(),
            failure: Some(message.into()),
        }
    }
}

impl FragmentSource for FixedFragments {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<TextFragment>, OcrError> {
        match &self.failure {
            Some(message) => Err(OcrError::Recognition(message.clone())),
            None => Ok(self.fragments.clone()),
        }
    }
}

/// Outcome of reading one card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardReading {
    pub form: FormResult,
    /// Set when OCR failed; `form` then has every field absent.
    pub ocr_failure: Option<String>,
    /// Fragments handed to the resolver after confidence filtering.
    pub fragment_count: usize,
}

impl CardReading {
    pub fn is_ocr_failure(&self) -> bool {
        self.ocr_failure.is_some()
    }
}

/// Reads card images into form results.
pub struct CardReader<S> {
    source: S,
    resolver: FieldResolver,
    max_image_size: u32,
    min_fragment_confidence: f32,
}

impl<S: FragmentSource> CardReader<S> {
    pub fn new(source: S, config: &TallyConfig) -> Self {
        Self {
            source,
            resolver: FieldResolver::new(config.effective_matching()),
            max_image_size: config.ocr.max_image_size,
            min_fragment_confidence: config.ocr.min_fragment_confidence,
        }
    }

    pub fn resolver(&self) -> &FieldResolver {
        &self.resolver
    }

    /// Open an image file and read it.
    pub fn read_path(&self, path: &Path, schema: &FormSchema) -> crate::Result<CardReading> {
        info!("Reading card image: {}", path.display());
        let image = image::open(path)?;
        Ok(self.read_image(&image, schema)?)
    }

    /// Normalize `image`, run OCR and resolve `schema`.
    pub fn read_image(
        &self,
        image: &DynamicImage,
        schema: &FormSchema,
    ) -> Result<CardReading, ExtractionError> {
        schema.validate()?;

        let (width, height) = image.dimensions();
        let recognized = if width == 0 || height == 0 {
            Err(OcrError::InvalidImage(format!("empty image {}x{}", width, height)))
        } else {
            let image = resize_to_max_dimension(image, self.max_image_size);
            self.source.recognize(&image)
        };

        match recognized {
            Ok(fragments) => self.read_fragments(fragments, schema),
            Err(e) => {
                warn!("OCR failed, reporting every field as absent: {}", e);
                Ok(CardReading {
                    form: FormResult::all_absent(schema),
                    ocr_failure: Some(e.to_string()),
                    fragment_count: 0,
                })
            }
        }
    }

    /// Resolve `schema` against fragments that were recognized elsewhere.
    pub fn read_fragments(
        &self,
        fragments: Vec<TextFragment>,
        schema: &FormSchema,
    ) -> Result<CardReading, ExtractionError> {
        let total = fragments.len();
        let kept: Vec<TextFragment> = fragments
            .into_iter()
            .filter(|f| f.confidence() >= self.min_fragment_confidence)
            .collect();

        if kept.len() < total {
            debug!(
                "Dropped {} fragments below confidence {}",
                total - kept.len(),
                self.min_fragment_confidence
            );
        }

        let form = self.resolver.resolve(&kept, schema)?;
        Ok(CardReading {
            form,
            ocr_failure: None,
            fragment_count: kept.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result::FieldResult;
    use crate::models::schema::CategorySchema;
    use pretty_assertions::assert_eq;

    fn fragment(text: &str, confidence: f32, x: f32, y: f32) -> TextFragment {
        TextFragment::from_parts(text, confidence, [x, y, x + 60.0, y + 20.0]).unwrap()
    }

    fn schema() -> FormSchema {
        FormSchema::new(vec![CategorySchema::new("Smoking", ["Cigarette butts", "Lighters"])])
    }

    fn blank_image() -> DynamicImage {
        DynamicImage::new_rgb8(200, 100)
    }

    #[test]
    fn test_reads_fragments_from_source() {
        let source = FixedFragments::new(vec![
            fragment("Cigarette butts", 0.9, 100.0, 20.0),
            fragment("=12", 0.85, 180.0, 21.0),
        ]);
        let reader = CardReader::new(source, &TallyConfig::default());

        let reading = reader.read_image(&blank_image(), &schema()).unwrap();
        assert!(!reading.is_ocr_failure());
        assert_eq!(reading.fragment_count, 2);
        assert_eq!(
            reading.form.field("Smoking", "Cigarette butts"),
            Some(&FieldResult::found(12, 0.85))
        );
        assert_eq!(
            reading.form.field("Smoking", "Lighters"),
            Some(&FieldResult::label_missing())
        );
    }

    #[test]
    fn test_ocr_failure_yields_all_absent() {
        let reader = CardReader::new(FixedFragments::failing("model crashed"), &TallyConfig::default());

        let reading = reader.read_image(&blank_image(), &schema()).unwrap();
        assert!(reading.is_ocr_failure());
        assert!(reading.ocr_failure.unwrap().contains("model crashed"));
        assert_eq!(reading.form, FormResult::all_absent(&schema()));
    }

    #[test]
    fn test_empty_image_is_ocr_failure() {
        let source = FixedFragments::new(vec![fragment("Lighters", 0.9, 0.0, 0.0)]);
        let reader = CardReader::new(source, &TallyConfig::default());

        let reading = reader.read_image(&DynamicImage::new_rgb8(0, 0), &schema()).unwrap();
        assert!(reading.ocr_failure.unwrap().contains("empty image"));
    }

    #[test]
    fn test_low_confidence_fragments_dropped() {
        let mut config = TallyConfig::default();
        config.ocr.min_fragment_confidence = 0.5;
        let reader = CardReader::new(FixedFragments::default(), &config);

        let fragments = vec![
            fragment("Cigarette butts", 0.9, 100.0, 20.0),
            fragment("=12", 0.3, 180.0, 21.0),
        ];
        let reading = reader.read_fragments(fragments, &schema()).unwrap();
        assert_eq!(reading.fragment_count, 1);
        assert_eq!(
            reading.form.field("Smoking", "Cigarette butts"),
            Some(&FieldResult::count_missing())
        );
    }

    #[test]
    fn test_unbounded_image_size_still_links_counts() {
        let mut config = TallyConfig::default();
        config.ocr.max_image_size = 0;
        let reader = CardReader::new(FixedFragments::default(), &config);

        let fragments = vec![
            fragment("Cigarette butts", 0.9, 100.0, 200.0),
            fragment("=12", 0.85, 120.0, 202.0),
        ];
        let reading = reader.read_fragments(fragments, &schema()).unwrap();
        assert_eq!(
            reading.form.field("Smoking", "Cigarette butts"),
            Some(&FieldResult::found(12, 0.85))
        );
    }

    #[test]
    fn test_invalid_schema_rejected_before_ocr() {
        let reader = CardReader::new(FixedFragments::failing("unused"), &TallyConfig::default());
        let bad = FormSchema::new(vec![CategorySchema::new("", ["cans"])]);
        assert!(reader.read_image(&blank_image(), &bad).is_err());
    }
}
