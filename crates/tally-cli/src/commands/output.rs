//! Output formatting shared by `extract` and `batch`.

use std::path::Path;

use serde::Serialize;

use tally_core::validation::FieldStatus;
use tally_core::{CardReading, FormResult, FormSchema, ValidatedForm, ValidationConfig};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON report
    Json,
    /// CSV rows, one per field
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Extraction outcome for one card, as written to disk or stdout.
#[derive(Debug, Serialize)]
pub struct CardReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_failure: Option<String>,
    pub issue_count: usize,
    pub result: FormResult,
    pub review: ValidatedForm,
}

impl CardReport {
    pub fn new(
        source: &Path,
        reading: CardReading,
        schema: &FormSchema,
        config: &ValidationConfig,
    ) -> Self {
        let review = ValidatedForm::from_result(schema, &reading.form, config);
        Self {
            source: source.display().to_string(),
            ocr_failure: reading.ocr_failure,
            issue_count: review.issue_count(),
            result: reading.form,
            review,
        }
    }
}

/// Parse a `key=value` metadata pair.
pub fn parse_meta(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid metadata '{}': expected key=value", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid metadata '{}': empty key", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Reject metadata that would produce the same CSV column twice.
pub fn check_meta(meta: &[(String, String)]) -> anyhow::Result<()> {
    const RESERVED: [&str; 3] = ["field_name", "value", "category_name"];

    for (i, (key, _)) in meta.iter().enumerate() {
        if RESERVED.contains(&key.as_str()) {
            anyhow::bail!("Metadata key '{}' clashes with a CSV column", key);
        }
        if meta[..i].iter().any(|(k, _)| k == key) {
            anyhow::bail!("Duplicate metadata key: {}", key);
        }
    }
    Ok(())
}

pub fn format_report(
    report: &CardReport,
    format: OutputFormat,
    meta: &[(String, String)],
    show_confidence: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => format_csv(&report.review, meta),
        OutputFormat::Text => Ok(format_text(report, show_confidence)),
    }
}

/// Rows of `field_name,value,category_name` followed by metadata columns.
pub fn format_csv(form: &ValidatedForm, meta: &[(String, String)]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["field_name", "value", "category_name"];
    header.extend(meta.iter().map(|(k, _)| k.as_str()));
    wtr.write_record(&header)?;

    for (category, field) in form.fields() {
        let value = field.value.to_string();
        let mut row = vec![field.name.as_str(), value.as_str(), category];
        row.extend(meta.iter().map(|(_, v)| v.as_str()));
        wtr.write_record(&row)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &CardReport, show_confidence: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!("Card: {}\n", report.source));
    if let Some(failure) = &report.ocr_failure {
        output.push_str(&format!("OCR failed: {}\n", failure));
    }
    output.push_str(&format!("Fields needing review: {}\n", report.issue_count));

    for category in &report.review.categories {
        output.push('\n');
        output.push_str(&format!("{}:\n", category.name));
        for field in &category.fields {
            let marker = match field.status {
                FieldStatus::Confident => " ",
                FieldStatus::NeedsValidation => "?",
            };
            if show_confidence {
                output.push_str(&format!(
                    " {} {:<30} {:>5}  ({:.0}%)\n",
                    marker,
                    field.name,
                    field.value,
                    field.confidence * 100.0
                ));
            } else {
                output.push_str(&format!(" {} {:<30} {:>5}\n", marker, field.name, field.value));
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{CategorySchema, FieldResult};

    fn report() -> CardReport {
        let schema = FormSchema::new(vec![CategorySchema::new("Metal", ["cans", "foil"])]);
        let mut form = FormResult::all_absent(&schema);
        form.categories
            .get_mut("Metal")
            .unwrap()
            .fields
            .insert("cans".to_string(), FieldResult::found(3, 0.99));
        let reading = CardReading {
            form,
            ocr_failure: None,
            fragment_count: 2,
        };
        CardReport::new(
            Path::new("card.json"),
            reading,
            &schema,
            &ValidationConfig::default(),
        )
    }

    #[test]
    fn test_parse_meta() {
        assert_eq!(
            parse_meta("date=2024-01-01"),
            Ok(("date".to_string(), "2024-01-01".to_string()))
        );
        assert_eq!(
            parse_meta("site=North beach=east"),
            Ok(("site".to_string(), "North beach=east".to_string()))
        );
        assert!(parse_meta("date").is_err());
        assert!(parse_meta("=x").is_err());
    }

    #[test]
    fn test_check_meta() {
        let meta = |keys: &[&str]| -> Vec<(String, String)> {
            keys.iter().map(|k| (k.to_string(), String::new())).collect()
        };
        assert!(check_meta(&meta(&["date", "site"])).is_ok());
        assert!(check_meta(&meta(&["date", "date"])).is_err());
        assert!(check_meta(&meta(&["value"])).is_err());
    }

    #[test]
    fn test_csv_rows_with_metadata() {
        let meta = vec![("date".to_string(), "2024-01-01".to_string())];
        let csv = format_csv(&report().review, &meta).unwrap();
        assert_eq!(
            csv,
            "field_name,value,category_name,date\ncans,3,Metal,2024-01-01\nfoil,0,Metal,2024-01-01\n"
        );
    }

    #[test]
    fn test_report_counts_issues() {
        let report = report();
        assert_eq!(report.issue_count, 1);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("ocr_failure").is_none());
        assert_eq!(json["result"]["categories"]["Metal"]["fields"]["foil"]["value"], serde_json::Value::Null);
    }

    #[test]
    fn test_text_marks_fields_needing_review() {
        let text = format_text(&report(), true);
        assert!(text.contains("Metal:"));
        assert!(text.contains(" ? foil"));
        assert!(text.contains("(99%)"));
    }
}
