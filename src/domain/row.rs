//! Parsed-but-not-yet-normalized CSV row

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One parsed CSV line, positionally assembled by a parser
///
/// Every field defaults to empty/zero when the source line does not carry it.
/// The amount keeps the sign the file had; normalization decides direction
/// from it and then takes the absolute value. A row with an empty date, an
/// empty category, or a zero amount never becomes a
/// [`Movement`](crate::domain::Movement).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvRow {
    /// Identifier from the source, free-form
    pub id: String,
    /// Date exactly as written in the file
    pub date: String,
    pub status: String,
    /// Explicit movement type token (`ingreso` / `egreso`), when present
    pub kind: String,
    pub account: String,
    pub payee: String,
    /// Raw category string, possibly `"Group:Subgroup"`
    pub category: String,
    /// Signed amount as parsed from the file
    pub amount: Decimal,
    pub currency: String,
    pub reference: String,
    pub notes: String,
}
