//! Field normalization
//!
//! Every function here is total: bad input degrades to a defined default
//! instead of an error. Dates stay literal strings - `normalize_date` only
//! reshapes `D/M/YY` into `DD/MM/YYYY` and returns anything else untouched,
//! never fabricating a date.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::domain::{Category, CsvRow, Direction, Movement};

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})$").expect("valid date pattern"));

/// Currencies the dashboard accepts; anything else falls back to ARS
const CURRENCY_WHITELIST: &[&str] = &["ARS", "USD", "EUR", "BRL", "CLP", "COP", "MXN"];

/// Canonicalize `D/M/YY` or `D/M/YYYY` into `DD/MM/YYYY`
///
/// Two-digit years are expanded by prefixing `20`. Input that does not match
/// the pattern is returned unchanged.
pub fn normalize_date(input: &str) -> String {
    let trimmed = input.trim();
    let Some(captures) = DATE_RE.captures(trimmed) else {
        return input.to_string();
    };

    let day = &captures[1];
    let month = &captures[2];
    let year = &captures[3];
    let year = if year.len() == 2 {
        format!("20{}", year)
    } else {
        year.to_string()
    };

    format!("{:0>2}/{:0>2}/{}", day, month, year)
}

/// Split a category string on the first `:` into group and subgroup
pub fn normalize_category(input: &str) -> Category {
    match input.split_once(':') {
        Some((group, subgroup)) => {
            let subgroup = subgroup.trim();
            Category::new(
                group.trim(),
                (!subgroup.is_empty()).then(|| subgroup.to_string()),
            )
        }
        None => Category::new(input.trim(), None),
    }
}

/// Parse an amount keeping its sign; everything but digits, `.` and `-` is
/// stripped first. Non-parseable input yields zero.
pub fn parse_signed_amount(input: &str) -> Decimal {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().unwrap_or(Decimal::ZERO)
}

/// Parse an amount and return its absolute value; non-parseable input yields
/// zero
pub fn normalize_amount(input: &str) -> Decimal {
    parse_signed_amount(input).abs()
}

/// Upper-case and check against the currency whitelist; unknown codes default
/// to `ARS`
pub fn normalize_currency(input: &str) -> String {
    let upper = input.trim().to_uppercase();
    if CURRENCY_WHITELIST.contains(&upper.as_str()) {
        upper
    } else {
        "ARS".to_string()
    }
}

/// Resolve a movement's direction
///
/// An explicit `ingreso`/`egreso` token wins; otherwise the sign of the raw
/// amount decides, with zero counting as inflow.
pub fn normalize_movement_type(explicit: &str, signed_amount: Decimal) -> Direction {
    match explicit.trim().to_lowercase().as_str() {
        "ingreso" => Direction::Ingreso,
        "egreso" => Direction::Egreso,
        _ => {
            if signed_amount >= Decimal::ZERO {
                Direction::Ingreso
            } else {
                Direction::Egreso
            }
        }
    }
}

/// Convert a parsed row into a normalized movement
///
/// Returns `None` when any of the three mandatory-field gates fails: empty
/// date, empty category group, or an amount of exactly zero.
pub fn csv_row_to_movement(row: &CsvRow) -> Option<Movement> {
    let date = normalize_date(&row.date);
    let category = normalize_category(&row.category);
    let direction = normalize_movement_type(&row.kind, row.amount);
    let amount = row.amount.abs();

    if date.trim().is_empty() || category.group.is_empty() || amount == Decimal::ZERO {
        return None;
    }

    let optional = |value: &str| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    Some(Movement {
        date,
        category,
        direction,
        amount,
        note: optional(&row.notes),
        external_id: optional(&row.id),
        balance: None,
    })
}
