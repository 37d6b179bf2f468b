//! Extraction results per field, category, and form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

use super::schema::FormSchema;

/// Count and confidence extracted for one field.
///
/// `value` and `confidence` are either both present or both absent.
/// `(Some(0), Some(0.0))` means the label was found but no count could be
/// linked to it; `(None, None)` means the label itself was not found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldResult", into = "RawFieldResult")]
pub struct FieldResult {
    value: Option<u32>,
    confidence: Option<f32>,
}

/// The three states a [`FieldResult`] can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldOutcome {
    /// A count was read.
    Found,
    /// The label was found but its count was not.
    CountMissing,
    /// No fragment matched the label.
    LabelMissing,
}

impl FieldResult {
    /// A count read from a fragment.
    pub fn found(value: u32, confidence: f32) -> Self {
        Self {
            value: Some(value),
            confidence: Some(confidence),
        }
    }

    /// Label located, count not locatable: the `(0, 0.0)` sentinel.
    pub fn count_missing() -> Self {
        Self::found(0, 0.0)
    }

    /// No label match at all.
    pub fn label_missing() -> Self {
        Self {
            value: None,
            confidence: None,
        }
    }

    pub fn value(&self) -> Option<u32> {
        self.value
    }

    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }

    /// Classify this result.
    ///
    /// A zero count with exactly `0.0` confidence is the count-missing
    /// sentinel; any other zero is a genuine read of the value zero.
    pub fn outcome(&self) -> FieldOutcome {
        match (self.value, self.confidence) {
            (Some(0), Some(c)) if c == 0.0 => FieldOutcome::CountMissing,
            (Some(_), Some(_)) => FieldOutcome::Found,
            _ => FieldOutcome::LabelMissing,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawFieldResult {
    value: Option<u32>,
    confidence: Option<f32>,
}

impl TryFrom<RawFieldResult> for FieldResult {
    type Error = ExtractionError;

    fn try_from(raw: RawFieldResult) -> Result<Self, Self::Error> {
        match (raw.value, raw.confidence) {
            (Some(value), Some(confidence)) => Ok(FieldResult::found(value, confidence)),
            (None, None) => Ok(FieldResult::label_missing()),
            _ => Err(ExtractionError::UnpairedResult),
        }
    }
}

impl From<FieldResult> for RawFieldResult {
    fn from(result: FieldResult) -> Self {
        RawFieldResult {
            value: result.value,
            confidence: result.confidence,
        }
    }
}

/// Results for every field of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub name: String,
    pub fields: BTreeMap<String, FieldResult>,
}

/// Results for every category of a form, keyed by category name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormResult {
    pub categories: BTreeMap<String, CategoryResult>,
}

impl FormResult {
    /// Result where every schema field is absent, used when OCR yields nothing.
    pub fn all_absent(schema: &FormSchema) -> Self {
        let categories = schema
            .categories
            .iter()
            .map(|category| {
                let fields = category
                    .field_names()
                    .map(|name| (name.to_string(), FieldResult::label_missing()))
                    .collect();
                (
                    category.name.clone(),
                    CategoryResult {
                        name: category.name.clone(),
                        fields,
                    },
                )
            })
            .collect();

        Self { categories }
    }

    /// Look up a single field result.
    pub fn field(&self, category: &str, field: &str) -> Option<&FieldResult> {
        self.categories.get(category)?.fields.get(field)
    }

    /// Total number of field results.
    pub fn field_count(&self) -> usize {
        self.categories.values().map(|c| c.fields.len()).sum()
    }

    /// Count fields in each outcome state: (found, count missing, label missing).
    pub fn outcome_counts(&self) -> (usize, usize, usize) {
        self.categories
            .values()
            .flat_map(|c| c.fields.values())
            .fold((0, 0, 0), |(found, count, label), r| match r.outcome() {
                FieldOutcome::Found => (found + 1, count, label),
                FieldOutcome::CountMissing => (found, count + 1, label),
                FieldOutcome::LabelMissing => (found, count, label + 1),
            })
    }
}
