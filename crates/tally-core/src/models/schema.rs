//! Form schema: the categories and field names a data card is expected to carry.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// A single field, e.g. "Plastic cups/lids".
///
/// Slash-separated synonyms are kept as opaque text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
}

/// A named group of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

/// Complete form schema in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchema {
    pub categories: Vec<CategorySchema>,
}

impl CategorySchema {
    pub fn new<S: Into<String>>(name: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|name| FieldSchema { name: name.into() })
                .collect(),
        }
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

impl FormSchema {
    pub fn new(categories: Vec<CategorySchema>) -> Self {
        Self { categories }
    }

    /// Load a schema from a JSON file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let schema: Self = serde_json::from_str(&content)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check names are non-blank and unique where results are keyed by them.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        let mut categories = HashSet::new();

        for (index, category) in self.categories.iter().enumerate() {
            if category.name.trim().is_empty() {
                return Err(ExtractionError::EmptyCategoryName(index));
            }
            if !categories.insert(category.name.as_str()) {
                return Err(ExtractionError::DuplicateCategory(category.name.clone()));
            }

            let mut fields = HashSet::new();
            for field in &category.fields {
                if field.name.trim().is_empty() {
                    return Err(ExtractionError::EmptyFieldName {
                        category: category.name.clone(),
                    });
                }
                if !fields.insert(field.name.as_str()) {
                    return Err(ExtractionError::DuplicateField {
                        category: category.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Every distinct field name across all categories, first occurrence first.
    pub fn all_field_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.categories
            .iter()
            .flat_map(|c| c.field_names())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Total number of declared fields.
    pub fn field_count(&self) -> usize {
        self.categories.iter().map(|c| c.fields.len()).sum()
    }
}
