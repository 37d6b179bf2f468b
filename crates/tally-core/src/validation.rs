//! Review validation of extracted counts.
//!
//! Turns raw extraction results into the form shown to a reviewer: every
//! field gets a concrete count and a status saying whether a person should
//! check it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::config::ValidationConfig;
use crate::models::result::{FieldOutcome, FieldResult, FormResult};
use crate::models::schema::FormSchema;

/// Whether a field's count can be trusted as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldStatus {
    Confident,
    NeedsValidation,
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldStatus::Confident => write!(f, "confident"),
            FieldStatus::NeedsValidation => write!(f, "needs-validation"),
        }
    }
}

/// One field as presented for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedField {
    pub name: String,
    /// Count to record; absent values become 0.
    pub value: u32,
    /// Confidence the status was derived from; absent confidence becomes 0.0.
    pub confidence: f32,
    pub status: FieldStatus,
    pub outcome: FieldOutcome,
}

impl ValidatedField {
    pub fn from_result(name: impl Into<String>, result: &FieldResult, config: &ValidationConfig) -> Self {
        let value = result.value().unwrap_or(0);
        let confidence = result.confidence().unwrap_or(0.0);
        let status = if confidence < config.confident_threshold {
            FieldStatus::NeedsValidation
        } else {
            FieldStatus::Confident
        };

        Self {
            name: name.into(),
            value,
            confidence,
            status,
            outcome: result.outcome(),
        }
    }

    pub fn has_issue(&self) -> bool {
        self.status == FieldStatus::NeedsValidation
    }
}

/// A category's fields in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedCategory {
    pub name: String,
    pub fields: Vec<ValidatedField>,
}

/// A whole card, ready for review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatedForm {
    pub categories: Vec<ValidatedCategory>,
}

impl ValidatedForm {
    /// Validate `result` against `schema`, keeping schema order.
    ///
    /// A schema field missing from `result` is treated as not found.
    pub fn from_result(schema: &FormSchema, result: &FormResult, config: &ValidationConfig) -> Self {
        let categories = schema
            .categories
            .iter()
            .map(|category| {
                let extracted = result.categories.get(&category.name);
                let fields = category
                    .field_names()
                    .map(|name| {
                        let field = extracted
                            .and_then(|c| c.fields.get(name))
                            .copied()
                            .unwrap_or_else(FieldResult::label_missing);
                        ValidatedField::from_result(name, &field, config)
                    })
                    .collect();

                ValidatedCategory {
                    name: category.name.clone(),
                    fields,
                }
            })
            .collect();

        Self { categories }
    }

    /// Number of fields a reviewer should look at.
    pub fn issue_count(&self) -> usize {
        self.fields().filter(|(_, f)| f.has_issue()).count()
    }

    /// Every field with its category name, in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &ValidatedField)> {
        self.categories
            .iter()
            .flat_map(|c| c.fields.iter().map(move |f| (c.name.as_str(), f)))
    }
}

/// Sort items so the forms with the most issues come first.
///
/// Items with equal issue counts keep their relative order.
pub fn sort_by_issues<T>(items: &mut [T], form: impl Fn(&T) -> Option<&ValidatedForm>) {
    items.sort_by_key(|item| std::cmp::Reverse(form(item).map_or(0, ValidatedForm::issue_count)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result::CategoryResult;
    use crate::models::schema::CategorySchema;
    use pretty_assertions::assert_eq;

    fn validate(result: &FieldResult) -> ValidatedField {
        ValidatedField::from_result("cans", result, &ValidationConfig::default())
    }

    #[test]
    fn test_high_confidence_is_confident() {
        let field = validate(&FieldResult::found(12, 0.97));
        assert_eq!(field.value, 12);
        assert_eq!(field.status, FieldStatus::Confident);
    }

    #[test]
    fn test_low_confidence_needs_validation() {
        let field = validate(&FieldResult::found(12, 0.94));
        assert_eq!(field.status, FieldStatus::NeedsValidation);
    }

    #[test]
    fn test_absent_value_becomes_zero() {
        let field = validate(&FieldResult::label_missing());
        assert_eq!(field.value, 0);
        assert_eq!(field.confidence, 0.0);
        assert_eq!(field.status, FieldStatus::NeedsValidation);
        assert_eq!(field.outcome, FieldOutcome::LabelMissing);
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(FieldStatus::NeedsValidation).unwrap(),
            serde_json::json!("needs-validation")
        );
        assert_eq!(FieldStatus::Confident.to_string(), "confident");
    }

    #[test]
    fn test_form_keeps_schema_order_and_counts_issues() {
        let schema = FormSchema::new(vec![CategorySchema::new("Plastic", ["Straws", "Bags", "Cups"])]);
        let mut result = FormResult::all_absent(&schema);
        let fields = &mut result.categories.get_mut("Plastic").unwrap().fields;
        fields.insert("Straws".to_string(), FieldResult::found(4, 0.99));
        fields.insert("Bags".to_string(), FieldResult::count_missing());

        let form = ValidatedForm::from_result(&schema, &result, &ValidationConfig::default());
        let names: Vec<&str> = form.fields().map(|(_, f)| f.name.as_str()).collect();
        assert_eq!(names, vec!["Straws", "Bags", "Cups"]);
        assert_eq!(form.issue_count(), 2);
    }

    #[test]
    fn test_missing_category_in_result() {
        let schema = FormSchema::new(vec![CategorySchema::new("Metal", ["cans"])]);
        let result = FormResult {
            categories: [(
                "Glass".to_string(),
                CategoryResult {
                    name: "Glass".to_string(),
                    fields: Default::default(),
                },
            )]
            .into_iter()
            .collect(),
        };

        let form = ValidatedForm::from_result(&schema, &result, &ValidationConfig::default());
        assert_eq!(form.categories[0].fields[0].outcome, FieldOutcome::LabelMissing);
    }

    #[test]
    fn test_sort_by_issues_most_first() {
        let schema = FormSchema::new(vec![CategorySchema::new("Metal", ["cans", "foil"])]);
        let config = ValidationConfig::default();

        let clean = {
            let mut r = FormResult::all_absent(&schema);
            for field in r.categories.get_mut("Metal").unwrap().fields.values_mut() {
                *field = FieldResult::found(1, 0.99);
            }
            ValidatedForm::from_result(&schema, &r, &config)
        };
        let messy = ValidatedForm::from_result(&schema, &FormResult::all_absent(&schema), &config);

        let mut items = vec![("a", Some(clean.clone())), ("b", None), ("c", Some(messy))];
        sort_by_issues(&mut items, |(_, form)| form.as_ref());

        let order: Vec<&str> = items.iter().map(|(name, _)| *name).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }
}
