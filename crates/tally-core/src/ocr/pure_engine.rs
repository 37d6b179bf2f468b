//! Native fragment source using `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::models::fragment::{BoundingBox, TextFragment};

use super::FragmentSource;

/// PaddleOCR models run in pure Rust (no external ONNX Runtime).
pub struct PureOcrSource {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

impl PureOcrSource {
    /// Load detection, recognition and dictionary files from `model_dir`.
    pub fn from_dir(model_dir: &Path, config: &OcrConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join(&config.detection_model);
        let rec_path = model_dir.join(&config.recognition_model);
        let dict_path = model_dir.join(&config.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine })
    }
}

impl FragmentSource for PureOcrSource {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextFragment>, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let fragments = results
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.text.trim().is_empty())
            .map(|(index, r)| {
                let text = r.text.replace("[UNK]", " ");
                let confidence = r.confidence.clamp(0.0, 1.0);
                polygon_to_box(&r.bounding_box)
                    .and_then(|bbox| TextFragment::new(text, confidence, bbox))
                    .map_err(|source| OcrError::InvalidFragment { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "OCR complete on {}x{}: {} fragments in {}ms",
            width,
            height,
            fragments.len(),
            start.elapsed().as_millis()
        );

        Ok(fragments)
    }
}

/// Axis-aligned box enclosing a detection polygon.
fn polygon_to_box(polygon: &pure_onnx_ocr::Polygon<f64>) -> Result<BoundingBox, crate::error::FragmentError> {
    BoundingBox::enclosing(
        polygon
            .exterior()
            .coords()
            .map(|c| (c.x as f32, c.y as f32)),
    )
}
