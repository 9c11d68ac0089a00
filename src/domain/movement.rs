//! Movement domain model
//!
//! A `Movement` is one normalized financial transaction. Its date is kept as
//! the literal `DD/MM/YYYY` string from the source file - never parsed into a
//! date type, so no locale or timezone drift can alter what the user imported.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a movement. Always paired with a non-negative amount;
/// polarity is carried here, not in the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Inflow
    Ingreso,
    /// Outflow
    Egreso,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ingreso => "ingreso",
            Direction::Egreso => "egreso",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-level category split from a `"Group:Subgroup"` string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "grupo")]
    pub group: String,
    #[serde(rename = "subgrupo", skip_serializing_if = "Option::is_none")]
    pub subgroup: Option<String>,
}

impl Category {
    pub fn new(group: impl Into<String>, subgroup: Option<String>) -> Self {
        Self {
            group: group.into(),
            subgroup,
        }
    }
}

/// A single normalized financial movement
///
/// Invariant: `amount > 0`. The converter that produces movements refuses to
/// emit one with a zero amount, and normalization takes the absolute value of
/// whatever the source carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Literal `DD/MM/YYYY` date string
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "categoria")]
    pub category: Category,
    #[serde(rename = "tipo")]
    pub direction: Direction,
    /// Always non-negative; `direction` carries polarity
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "nota", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Identifier from the source file, when it carried one
    #[serde(rename = "idExterno", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Running balance. The CSV layouts this crate parses carry no balance
    /// column, so the parsers always leave this `None`; the field exists for
    /// consumers that enrich movements after persistence.
    #[serde(rename = "saldo", skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
}

impl Movement {
    /// Convert to the wire shape used at the persistence boundary
    pub fn to_api(&self, source: Option<&str>) -> ApiMovement {
        ApiMovement {
            date: self.date.clone(),
            category: self.category.clone(),
            direction: self.direction,
            amount: self.amount,
            note: self.note.clone(),
            external_id: self.external_id.clone(),
            source: source.map(|s| s.to_string()),
        }
    }
}

/// Wire-shape subset of [`Movement`] exposed to the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMovement {
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "categoria")]
    pub category: Category,
    #[serde(rename = "tipo")]
    pub direction: Direction,
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "nota", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "idExterno", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}
