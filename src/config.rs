//! Pipeline configuration
//!
//! Explicit typed configuration for each stage, validated once at pipeline
//! entry. The JSON shapes match what the dashboard stores: camelCase keys,
//! Spanish logical field names for the column mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Declares one expected column when no header-based mapping is used
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    /// Header text of the column (e.g. `"Categoria"`)
    pub name: String,
    /// 1-based position in the line
    pub order: usize,
    /// Maximum number of extra embedded commas allowed in this column's value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_commas: Option<usize>,
}

/// Column index -> maximum extra embedded commas permitted in that column
///
/// Lets the smart tokenizer resolve excess-comma lines deterministically
/// instead of guessing. Ordered so target resolution can pick the lowest
/// configured index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCommasConfig {
    #[serde(default)]
    columns: BTreeMap<usize, usize>,
}

impl ColumnCommasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow up to `max_commas` extra commas in the column at `index`
    pub fn allow(mut self, index: usize, max_commas: usize) -> Self {
        self.columns.insert(index, max_commas);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Lowest configured column with a positive budget and a valid index.
    /// Returns `(column_index, max_commas)`.
    pub fn target_column(&self, token_count: usize) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .find(|(index, max)| **max > 0 && **index < token_count)
            .map(|(index, max)| (*index, *max))
    }
}

/// Logical field -> literal header text in the source file
///
/// `fecha` and `categoria` are required; at least one of `importe`, `egreso`,
/// `ingreso` must be present. Everything else is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "importe", default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(rename = "egreso", default, skip_serializing_if = "Option::is_none")]
    pub outflow: Option<String>,
    #[serde(rename = "ingreso", default, skip_serializing_if = "Option::is_none")]
    pub inflow: Option<String>,
    #[serde(rename = "divisa", default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(rename = "numero", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "nota", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(
        rename = "identificador",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
}

impl MappingConfig {
    /// Validate against the header tokens of the file being parsed
    ///
    /// Returns one message per violation; an empty list means the mapping is
    /// usable. No partial parse is attempted when this is non-empty.
    pub fn validate(&self, headers: &[String]) -> Vec<String> {
        let mut errors = Vec::new();

        let exists = |header: &str| {
            headers
                .iter()
                .any(|h| h.trim().eq_ignore_ascii_case(header.trim()))
        };

        if self.date.trim().is_empty() {
            errors.push("mapping is missing required field 'fecha'".to_string());
        } else if !exists(&self.date) {
            errors.push(format!(
                "mapped 'fecha' column '{}' not found in header",
                self.date
            ));
        }

        if self.category.trim().is_empty() {
            errors.push("mapping is missing required field 'categoria'".to_string());
        } else if !exists(&self.category) {
            errors.push(format!(
                "mapped 'categoria' column '{}' not found in header",
                self.category
            ));
        }

        let amount_fields = [
            ("importe", self.amount.as_deref()),
            ("egreso", self.outflow.as_deref()),
            ("ingreso", self.inflow.as_deref()),
        ];

        let mut any_amount_valid = false;
        let mut any_amount_present = false;
        for (field, mapped) in amount_fields {
            if let Some(header) = mapped.filter(|h| !h.trim().is_empty()) {
                any_amount_present = true;
                if exists(header) {
                    any_amount_valid = true;
                } else {
                    errors.push(format!(
                        "mapped '{}' column '{}' not found in header",
                        field, header
                    ));
                }
            }
        }

        if !any_amount_present {
            errors.push(
                "mapping needs at least one of 'importe', 'egreso', 'ingreso'".to_string(),
            );
        } else if !any_amount_valid {
            errors.push("no mapped amount column matches the header".to_string());
        }

        errors
    }
}

/// Options for a full processing run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOptions {
    /// Dataset name override; falls back to the file stem, then a generated name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_type: Option<String>,
    /// Declared schema for the positional parser
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_definitions: Option<Vec<ColumnDefinition>>,
    /// Explicit field mapping; when present it takes precedence over
    /// `column_definitions`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingConfig>,
}
