//! Resolution of every schema field against one card's fragments.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::ExtractionError;
use crate::models::config::MatchingConfig;
use crate::models::fragment::{sorted_by_reading_order, TextFragment};
use crate::models::result::{CategoryResult, FieldResult, FormResult};
use crate::models::schema::FormSchema;

use super::count::extract_embedded_after_label;
use super::linker::{BlockerIndex, SpatialLinker};
use super::matcher::LabelMatcher;

/// Maps OCR fragments onto a form schema.
///
/// Holds only configuration; one resolver can serve any number of images,
/// including from several threads at once.
#[derive(Debug, Clone, Default)]
pub struct FieldResolver {
    config: MatchingConfig,
    matcher: LabelMatcher,
    linker: SpatialLinker,
}

impl FieldResolver {
    pub fn new(config: MatchingConfig) -> Self {
        Self {
            matcher: LabelMatcher::new(config.clone()),
            linker: SpatialLinker::new(config.clone()),
            config,
        }
    }

    /// Resolve every field of `schema`.
    ///
    /// Every declared field appears in the result. An empty fragment list
    /// resolves every field to `(None, None)`.
    pub fn resolve(
        &self,
        fragments: &[TextFragment],
        schema: &FormSchema,
    ) -> Result<FormResult, ExtractionError> {
        schema.validate()?;

        if fragments.is_empty() {
            debug!("No fragments; all {} fields absent", schema.field_count());
            return Ok(FormResult::all_absent(schema));
        }

        let ordered = sorted_by_reading_order(fragments);
        let field_names = schema.all_field_names();
        let blockers = BlockerIndex::build(&field_names, &ordered, &self.config);

        let resolved: HashMap<&str, FieldResult> = field_names
            .iter()
            .map(|name| (*name, self.resolve_field(name, &ordered, &blockers)))
            .collect();

        let mut result = FormResult::default();
        for category in &schema.categories {
            let fields = category
                .field_names()
                .map(|name| {
                    let field = resolved
                        .get(name)
                        .copied()
                        .unwrap_or_else(FieldResult::label_missing);
                    (name.to_string(), field)
                })
                .collect();

            result.categories.insert(
                category.name.clone(),
                CategoryResult {
                    name: category.name.clone(),
                    fields,
                },
            );
        }

        let (found, count_missing, label_missing) = result.outcome_counts();
        info!(
            "Resolved {} fields from {} fragments: {} found, {} without count, {} without label",
            result.field_count(),
            fragments.len(),
            found,
            count_missing,
            label_missing
        );

        Ok(result)
    }

    /// Resolve a single field against fragments already in reading order.
    pub fn resolve_field(
        &self,
        field_name: &str,
        fragments: &[TextFragment],
        blockers: &BlockerIndex,
    ) -> FieldResult {
        let Some(anchor) = self.matcher.best(field_name, fragments) else {
            debug!("'{}': no label match", field_name);
            return FieldResult::label_missing();
        };

        let label = anchor.fragment;
        let key_words = self.matcher.key_words(field_name);

        if let Some(value) = extract_embedded_after_label(label.text(), &key_words) {
            debug!(
                "'{}': count {} embedded in label '{}'",
                field_name,
                value,
                label.text()
            );
            return FieldResult::found(value, label.confidence());
        }

        match self
            .linker
            .find_nearest_right_count(label, fragments, blockers, field_name)
        {
            Some(linked) => {
                debug!(
                    "'{}': count {} from '{}' at dx={:.0}",
                    field_name,
                    linked.value,
                    linked.fragment.text(),
                    linked.dx
                );
                FieldResult::found(linked.value, linked.confidence)
            }
            None => {
                debug!(
                    "'{}': label '{}' found but no count linked",
                    field_name,
                    label.text()
                );
                FieldResult::count_missing()
            }
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result::FieldOutcome;
    use crate::models::schema::CategorySchema;
    use pretty_assertions::assert_eq;

    fn fragment(text: &str, confidence: f32, x: f32, y: f32) -> TextFragment {
        TextFragment::from_parts(text, confidence, [x, y, x + 60.0, y + 20.0]).unwrap()
    }

    fn schema(categories: Vec<(&str, Vec<&str>)>) -> FormSchema {
        FormSchema::new(
            categories
                .into_iter()
                .map(|(name, fields)| CategorySchema::new(name, fields))
                .collect(),
        )
    }

    fn resolve(fragments: &[TextFragment], schema: &FormSchema) -> FormResult {
        FieldResolver::default().resolve(fragments, schema).unwrap()
    }

    #[test]
    fn test_same_line_count() {
        let fragments = vec![
            fragment("Cigarette butts", 0.9, 100.0, 200.0),
            fragment("=12", 0.85, 120.0, 200.0),
        ];
        let schema = schema(vec![("Smoking", vec!["Cigarette butts"])]);

        let result = resolve(&fragments, &schema);
        assert_eq!(
            result.field("Smoking", "Cigarette butts"),
            Some(&FieldResult::found(12, 0.85))
        );
    }

    #[test]
    fn test_embedded_count() {
        let fragments = vec![fragment("Plastic bottles =8", 0.92, 40.0, 80.0)];
        let schema = schema(vec![("Plastic", vec!["Plastic bottles"])]);

        let result = resolve(&fragments, &schema);
        assert_eq!(
            result.field("Plastic", "Plastic bottles"),
            Some(&FieldResult::found(8, 0.92))
        );
    }

    #[test]
    fn test_exact_label_with_seven() {
        let fragments = vec![fragment("Glass bottles=7", 0.88, 10.0, 10.0)];
        let schema = schema(vec![("Glass", vec!["Glass bottles"])]);

        let result = resolve(&fragments, &schema);
        assert_eq!(
            result.field("Glass", "Glass bottles"),
            Some(&FieldResult::found(7, 0.88))
        );
    }

    #[test]
    fn test_empty_fragments() {
        let schema = schema(vec![("Metal", vec!["cans"])]);
        let result = resolve(&[], &schema);

        assert_eq!(
            serde_json::to_value(&result.categories["Metal"].fields).unwrap(),
            serde_json::json!({"cans": {"value": null, "confidence": null}})
        );
    }

    #[test]
    fn test_label_without_count_is_sentinel() {
        let fragments = vec![
            fragment("Fishing line", 0.9, 10.0, 10.0),
            fragment("=3", 0.9, 10.0, 200.0),
        ];
        let schema = schema(vec![("Fishing", vec!["Fishing line", "Fishing lures"])]);

        let result = resolve(&fragments, &schema);
        let line = result.field("Fishing", "Fishing line").unwrap();
        assert_eq!(*line, FieldResult::count_missing());
        assert_eq!(line.outcome(), FieldOutcome::CountMissing);
    }

    #[test]
    fn test_missing_label() {
        let fragments = vec![fragment("Cigarette butts", 0.9, 10.0, 10.0)];
        let schema = schema(vec![("Metal", vec!["Aluminum foil"])]);

        let result = resolve(&fragments, &schema);
        assert_eq!(
            result.field("Metal", "Aluminum foil"),
            Some(&FieldResult::label_missing())
        );
    }

    #[test]
    fn test_every_schema_field_present() {
        let fragments = vec![
            fragment("Plastic bags", 0.9, 10.0, 10.0),
            fragment("=4", 0.9, 90.0, 12.0),
        ];
        let schema = schema(vec![
            ("Plastic", vec!["Plastic bags", "Straws", "Balloons"]),
            ("Metal", vec!["Bottle caps", "Nails"]),
            ("Other", vec![]),
        ]);

        let result = resolve(&fragments, &schema);
        assert_eq!(result.categories.len(), 3);
        assert_eq!(result.field_count(), 5);
        for category in &schema.categories {
            let mut expected: Vec<&str> = category.field_names().collect();
            expected.sort();
            let actual: Vec<&str> = result.categories[&category.name]
                .fields
                .keys()
                .map(String::as_str)
                .collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_card_line_with_several_fields() {
        // One printed line: "Cups =3   Lids =5   Straws =11"
        let fragments = vec![
            fragment("Straws", 0.93, 420.0, 500.0),
            fragment("=11", 0.81, 500.0, 503.0),
            fragment("Plastic cups", 0.97, 40.0, 500.0),
            fragment("=3", 0.9, 130.0, 501.0),
            fragment("Plastic lids", 0.96, 220.0, 499.0),
            fragment("=5", 0.87, 330.0, 500.0),
        ];
        let schema = schema(vec![("Plastic", vec!["Plastic cups", "Plastic lids", "Straws"])]);

        let result = resolve(&fragments, &schema);
        assert_eq!(result.field("Plastic", "Plastic cups"), Some(&FieldResult::found(3, 0.9)));
        assert_eq!(result.field("Plastic", "Plastic lids"), Some(&FieldResult::found(5, 0.87)));
        assert_eq!(result.field("Plastic", "Straws"), Some(&FieldResult::found(11, 0.81)));
    }

    #[test]
    fn test_count_before_label_falls_back_to_spatial() {
        let fragments = vec![
            fragment("=2 Rope", 0.9, 10.0, 10.0),
            fragment("=6", 0.75, 100.0, 11.0),
        ];
        let schema = schema(vec![("Other", vec!["Rope"])]);

        let result = resolve(&fragments, &schema);
        assert_eq!(result.field("Other", "Rope"), Some(&FieldResult::found(6, 0.75)));
    }

    #[test]
    fn test_resolution_is_independent_of_input_order() {
        let fragments = vec![
            fragment("Cigarette butts", 0.9, 100.0, 200.0),
            fragment("=12", 0.85, 180.0, 200.0),
            fragment("Food wrappers", 0.9, 100.0, 240.0),
            fragment("=4", 0.8, 190.0, 241.0),
        ];
        let mut reversed = fragments.clone();
        reversed.reverse();
        let schema = schema(vec![("Misc", vec!["Cigarette butts", "Food wrappers"])]);

        assert_eq!(resolve(&fragments, &schema), resolve(&reversed, &schema));
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let schema = schema(vec![("Metal", vec!["cans", "cans"])]);
        assert!(FieldResolver::default().resolve(&[], &schema).is_err());
    }
}
