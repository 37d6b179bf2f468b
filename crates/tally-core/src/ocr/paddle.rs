//! Adapter for PaddleOCR prediction JSON.
//!
//! PaddleOCR writes one object per page with parallel lists under `res`:
//!
//! ```json
//! {"res": {"rec_texts": ["=12"], "rec_scores": [0.85], "rec_boxes": [[120, 200, 160, 220]]}}
//! ```
//!
//! A bare `res` object, a list of pages, or a plain list of fragments
//! (`{"text", "confidence", "box"}`) are accepted as well.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::OcrError;
use crate::models::fragment::TextFragment;

#[derive(Debug, Deserialize)]
struct PaddleRes {
    #[serde(default)]
    rec_texts: Vec<String>,
    #[serde(default)]
    rec_scores: Vec<f32>,
    #[serde(default)]
    rec_boxes: Vec<Vec<f32>>,
}

/// Parse fragments from a JSON document in any accepted layout.
pub fn fragments_from_json(json: &str) -> Result<Vec<TextFragment>, OcrError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| OcrError::MalformedOutput(e.to_string()))?;
    fragments_from_paddle(&value)
}

/// Convert an already parsed JSON document into fragments.
pub fn fragments_from_paddle(value: &Value) -> Result<Vec<TextFragment>, OcrError> {
    match value {
        Value::Array(items) if items.iter().any(is_page) => {
            let mut fragments = Vec::new();
            for (page, item) in items.iter().enumerate() {
                let res = item.get("res").ok_or_else(|| {
                    OcrError::MalformedOutput(format!("page {} has no 'res' object", page))
                })?;
                fragments.extend(from_res(res, fragments.len())?);
            }
            Ok(fragments)
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                TextFragment::deserialize(item).map_err(|e| {
                    OcrError::MalformedOutput(format!("fragment {}: {}", index, e))
                })
            })
            .collect(),
        Value::Object(map) if map.contains_key("res") => from_res(&map["res"], 0),
        Value::Object(map) if map.contains_key("rec_texts") => from_res(value, 0),
        _ => Err(OcrError::MalformedOutput(
            "expected PaddleOCR output or a list of fragments".to_string(),
        )),
    }
}

fn is_page(item: &Value) -> bool {
    item.get("res").is_some()
}

/// Fragments from one `res` object; `offset` numbers them within the document.
fn from_res(res: &Value, offset: usize) -> Result<Vec<TextFragment>, OcrError> {
    let res = PaddleRes::deserialize(res).map_err(|e| OcrError::MalformedOutput(e.to_string()))?;

    if res.rec_texts.len() != res.rec_scores.len() || res.rec_texts.len() != res.rec_boxes.len() {
        return Err(OcrError::MalformedOutput(format!(
            "mismatched lengths: {} texts, {} scores, {} boxes",
            res.rec_texts.len(),
            res.rec_scores.len(),
            res.rec_boxes.len()
        )));
    }

    debug!("PaddleOCR page with {} fragments", res.rec_texts.len());

    res.rec_texts
        .into_iter()
        .zip(res.rec_scores)
        .zip(res.rec_boxes)
        .enumerate()
        .map(|(i, ((text, score), bbox))| {
            let index = offset + i;
            let coords: [f32; 4] = bbox.as_slice().try_into().map_err(|_| {
                OcrError::MalformedOutput(format!(
                    "fragment {}: box has {} coordinates, expected 4",
                    index,
                    bbox.len()
                ))
            })?;
            TextFragment::from_parts(text, score, coords)
                .map_err(|source| OcrError::InvalidFragment { index, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_page() {
        let json = r#"{"res": {
            "rec_texts": ["Cigarette butts", "=12"],
            "rec_scores": [0.9, 0.85],
            "rec_boxes": [[100, 200, 180, 220], [120, 200, 160, 220]]
        }}"#;

        let fragments = fragments_from_json(json).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].text(), "=12");
        assert_eq!(fragments[1].confidence(), 0.85);
        assert_eq!(fragments[1].bbox().to_array(), [120.0, 200.0, 160.0, 220.0]);
    }

    #[test]
    fn test_bare_res_and_page_list() {
        let bare = r#"{"rec_texts": ["=3"], "rec_scores": [0.7], "rec_boxes": [[1, 2, 3, 4]]}"#;
        assert_eq!(fragments_from_json(bare).unwrap().len(), 1);

        let pages = r#"[
            {"res": {"rec_texts": ["a"], "rec_scores": [0.7], "rec_boxes": [[1, 2, 3, 4]]}},
            {"res": {"rec_texts": ["b", "c"], "rec_scores": [0.7, 0.8], "rec_boxes": [[1, 2, 3, 4], [5, 6, 7, 8]]}}
        ]"#;
        let texts: Vec<String> = fragments_from_json(pages)
            .unwrap()
            .iter()
            .map(|f| f.text().to_string())
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_plain_fragment_list() {
        let json = r#"[{"text": "Plastic bottles =8", "confidence": 0.92, "box": [40, 80, 200, 100]}]"#;
        let fragments = fragments_from_json(json).unwrap();
        assert_eq!(fragments[0].text(), "Plastic bottles =8");
        assert_eq!(fragments[0].x(), 40.0);
    }

    #[test]
    fn test_empty_list() {
        assert!(fragments_from_json("[]").unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_lengths() {
        let json = r#"{"res": {"rec_texts": ["a", "b"], "rec_scores": [0.7], "rec_boxes": [[1, 2, 3, 4]]}}"#;
        assert!(matches!(
            fragments_from_json(json),
            Err(OcrError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_short_box() {
        let json = r#"{"res": {"rec_texts": ["a"], "rec_scores": [0.7], "rec_boxes": [[1, 2, 3]]}}"#;
        assert!(matches!(
            fragments_from_json(json),
            Err(OcrError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_inverted_box_reports_index() {
        let json = r#"{"res": {
            "rec_texts": ["a", "b"],
            "rec_scores": [0.7, 0.7],
            "rec_boxes": [[1, 2, 3, 4], [10, 2, 3, 4]]
        }}"#;
        assert!(matches!(
            fragments_from_json(json),
            Err(OcrError::InvalidFragment { index: 1, .. })
        ));
    }

    #[test]
    fn test_not_ocr_output() {
        assert!(fragments_from_json(r#"{"hello": 1}"#).is_err());
        assert!(fragments_from_json("not json").is_err());
    }
}
