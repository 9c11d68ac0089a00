//! Processed dataset and batch slice models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::movement::{ApiMovement, Movement};

/// Default currency when the source never names one
pub const DEFAULT_CURRENCY: &str = "ARS";

/// Default dataset type
pub const DEFAULT_DATASET_TYPE: &str = "movimientos";

/// A named, bounded collection of movements built from one or more files
///
/// Invariants: `movements` is never empty (a zero-movement build fails at
/// construction time), and `period_start <= period_end` under the sortable
/// date key whenever both bounds are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDataset {
    pub dataset_name: String,
    pub original_file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_by: Option<String>,
    pub currency: String,
    pub dataset_type: String,
    pub movements: Vec<Movement>,
    /// Earliest movement date, literal `DD/MM/YYYY`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_start: Option<String>,
    /// Latest movement date, literal `DD/MM/YYYY`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<String>,
}

/// A contiguous slice of a dataset's movements, the unit of submission
///
/// Produced and consumed entirely within one dispatcher run. `end_index` is
/// exclusive, so `end_index - start_index == size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfo {
    /// 1-based position of this batch in the run
    pub batch_number: usize,
    pub movements: Vec<Movement>,
    pub size: usize,
    pub start_index: usize,
    pub end_index: usize,
}

impl BatchInfo {
    /// Wire shapes for this batch, tagged with an optional source
    pub fn api_movements(&self, source: Option<&str>) -> Vec<ApiMovement> {
        self.movements.iter().map(|m| m.to_api(source)).collect()
    }

    /// Sum of the batch's movement amounts (all non-negative)
    pub fn total_amount(&self) -> Decimal {
        self.movements.iter().map(|m| m.amount).sum()
    }
}
