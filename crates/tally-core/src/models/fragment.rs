//! OCR text fragments.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::FragmentError;

/// Axis-aligned bounding box in pixels of the resized image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    /// Create a box, rejecting non-finite or inverted coordinates.
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Result<Self, FragmentError> {
        let coords = [x_min, y_min, x_max, y_max];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(FragmentError::NonFiniteCoordinate(coords));
        }
        if x_min > x_max || y_min > y_max {
            return Err(FragmentError::InvertedBox(coords));
        }
        Ok(Self {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Create a box from `[x_min, y_min, x_max, y_max]`.
    pub fn from_array(coords: [f32; 4]) -> Result<Self, FragmentError> {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    /// Smallest box enclosing every given point.
    pub fn enclosing(points: impl IntoIterator<Item = (f32, f32)>) -> Result<Self, FragmentError> {
        let mut x_min = f32::INFINITY;
        let mut y_min = f32::INFINITY;
        let mut x_max = f32::NEG_INFINITY;
        let mut y_max = f32::NEG_INFINITY;

        for (x, y) in points {
            x_min = x_min.min(x);
            y_min = y_min.min(y);
            x_max = x_max.max(x);
            y_max = y_max.max(y);
        }

        Self::new(x_min, y_min, x_max, y_max)
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }
}

/// One OCR detection: recognized text, its confidence, and where it sits.
///
/// Fragments are validated on construction and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFragment", into = "RawFragment")]
pub struct TextFragment {
    text: String,
    confidence: f32,
    bbox: BoundingBox,
}

impl TextFragment {
    /// Create a fragment, rejecting confidences outside `[0, 1]`.
    pub fn new(
        text: impl Into<String>,
        confidence: f32,
        bbox: BoundingBox,
    ) -> Result<Self, FragmentError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(FragmentError::ConfidenceOutOfRange(confidence));
        }
        Ok(Self {
            text: text.into(),
            confidence,
            bbox,
        })
    }

    /// Create a fragment from a raw `[x_min, y_min, x_max, y_max]` box.
    pub fn from_parts(
        text: impl Into<String>,
        confidence: f32,
        coords: [f32; 4],
    ) -> Result<Self, FragmentError> {
        Self::new(text, confidence, BoundingBox::from_array(coords)?)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Left edge, the x used for all spatial reasoning.
    pub fn x(&self) -> f32 {
        self.bbox.x_min
    }

    /// Top edge, the y used for all spatial reasoning.
    pub fn y(&self) -> f32 {
        self.bbox.y_min
    }
}

/// Wire form: `{"text": ..., "confidence": ..., "box": [x0, y0, x1, y1]}`.
#[derive(Serialize, Deserialize)]
struct RawFragment {
    text: String,
    confidence: f32,
    #[serde(rename = "box")]
    bbox: [f32; 4],
}

impl TryFrom<RawFragment> for TextFragment {
    type Error = FragmentError;

    fn try_from(raw: RawFragment) -> Result<Self, Self::Error> {
        TextFragment::from_parts(raw.text, raw.confidence, raw.bbox)
    }
}

impl From<TextFragment> for RawFragment {
    fn from(fragment: TextFragment) -> Self {
        RawFragment {
            bbox: fragment.bbox.to_array(),
            text: fragment.text,
            confidence: fragment.confidence,
        }
    }
}

/// Compare two fragments top-to-bottom, then left-to-right.
pub fn reading_order(a: &TextFragment, b: &TextFragment) -> Ordering {
    a.y()
        .total_cmp(&b.y())
        .then_with(|| a.x().total_cmp(&b.x()))
}

/// Copy of `fragments` sorted by `(y_min, x_min)`; equal positions keep input order.
pub fn sorted_by_reading_order(fragments: &[TextFragment]) -> Vec<TextFragment> {
    let mut sorted = fragments.to_vec();
    sorted.sort_by(reading_order);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rejects_inverted_box() {
        let err = BoundingBox::new(10.0, 0.0, 5.0, 10.0).unwrap_err();
        assert_eq!(err, FragmentError::InvertedBox([10.0, 0.0, 5.0, 10.0]));
    }

    #[test]
    fn test_rejects_non_finite_box() {
        assert!(matches!(
            BoundingBox::new(f32::NAN, 0.0, 5.0, 10.0),
            Err(FragmentError::NonFiniteCoordinate(_))
        ));
    }

    #[test]
    fn test_rejects_confidence_out_of_range() {
        assert!(TextFragment::from_parts("a", 1.2, [0.0, 0.0, 1.0, 1.0]).is_err());
        assert!(TextFragment::from_parts("a", f32::NAN, [0.0, 0.0, 1.0, 1.0]).is_err());
        assert!(TextFragment::from_parts("a", 0.0, [0.0, 0.0, 1.0, 1.0]).is_ok());
    }

    #[test]
    fn test_json_wire_form() {
        let json = r#"{"text": "Cigarette butts", "confidence": 0.9, "box": [10, 20, 150, 40]}"#;
        let fragment: TextFragment = serde_json::from_str(json).unwrap();

        assert_eq!(fragment.text(), "Cigarette butts");
        assert_eq!(fragment.x(), 10.0);
        assert_eq!(fragment.y(), 20.0);
        assert_eq!(fragment.bbox().width(), 140.0);

        let value = serde_json::to_value(&fragment).unwrap();
        assert_eq!(value["box"], serde_json::json!([10.0, 20.0, 150.0, 40.0]));
    }

    #[test]
    fn test_json_missing_box_fails() {
        let json = r#"{"text": "Cigarette butts", "confidence": 0.9}"#;
        assert!(serde_json::from_str::<TextFragment>(json).is_err());

        let short = r#"{"text": "x", "confidence": 0.9, "box": [1, 2, 3]}"#;
        assert!(serde_json::from_str::<TextFragment>(short).is_err());
    }

    #[test]
    fn test_enclosing_box() {
        let bbox = BoundingBox::enclosing([(5.0, 9.0), (1.0, 3.0), (7.0, 4.0)]).unwrap();
        assert_eq!(bbox.to_array(), [1.0, 3.0, 7.0, 9.0]);
        assert!(BoundingBox::enclosing(std::iter::empty()).is_err());
    }

    #[test]
    fn test_sorted_by_reading_order() {
        let fragments = vec![
            TextFragment::from_parts("c", 0.9, [50.0, 40.0, 60.0, 50.0]).unwrap(),
            TextFragment::from_parts("b", 0.9, [80.0, 10.0, 90.0, 20.0]).unwrap(),
            TextFragment::from_parts("a", 0.9, [20.0, 10.0, 30.0, 20.0]).unwrap(),
        ];

        let texts: Vec<String> = sorted_by_reading_order(&fragments)
            .iter()
            .map(|f| f.text().to_string())
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }
}
