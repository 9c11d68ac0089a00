//! Dataset building, merging, filtering and statistics
//!
//! Period bounds are computed over a sortable key derived from the literal
//! `DD/MM/YYYY` string (`YYYYMMDD` / `YYMMDD`), never by parsing into a date
//! type, so imported dates can never drift across locales or timezones.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{
    CsvRow, Direction, Movement, ProcessedDataset, DEFAULT_CURRENCY, DEFAULT_DATASET_TYPE,
};
use crate::services::normalizer::{csv_row_to_movement, normalize_currency};

/// Options for building a dataset from parsed rows
#[derive(Debug, Clone, Default)]
pub struct DatasetOptions {
    /// Explicit name override
    pub dataset_name: Option<String>,
    /// Source file name; its stem names the dataset when no override is given
    pub file_name: Option<String>,
    pub imported_by: Option<String>,
    pub dataset_type: Option<String>,
}

/// A built dataset plus the per-row errors collected while transforming
#[derive(Debug)]
pub struct DatasetBuildResult {
    pub dataset: ProcessedDataset,
    /// One entry per row that failed a mandatory-field gate
    pub row_errors: Vec<String>,
}

/// Sortable key for a literal `DD/MM/YYYY` (or `DD/MM/YY`) date string
///
/// Non-matching input sorts as itself, which keeps the ordering total.
pub fn sortable_date_key(date: &str) -> String {
    let parts: Vec<&str> = date.split('/').collect();
    if parts.len() == 3 {
        format!("{}{:0>2}{:0>2}", parts[2], parts[1], parts[0])
    } else {
        date.to_string()
    }
}

/// Transform rows into movements and aggregate them into a dataset
///
/// Rows failing a mandatory-field gate are dropped and reported in
/// `row_errors`; the build itself fails only when zero movements survive.
pub fn build_dataset_from_csv_rows(
    rows: &[CsvRow],
    options: &DatasetOptions,
) -> Result<DatasetBuildResult> {
    let mut movements = Vec::with_capacity(rows.len());
    let mut row_errors = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match csv_row_to_movement(row) {
            Some(movement) => movements.push(movement),
            None => row_errors.push(format!(
                "row {}: dropped (date '{}', category '{}', amount {})",
                index + 1,
                row.date,
                row.category,
                row.amount
            )),
        }
    }

    if movements.is_empty() {
        return Err(Error::empty_dataset(format!(
            "no movements survived transformation ({} rows rejected)",
            row_errors.len()
        )));
    }

    let (period_start, period_end) = period_bounds(&movements);

    let currency = rows
        .iter()
        .find(|row| !row.currency.trim().is_empty())
        .map(|row| normalize_currency(&row.currency))
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let dataset_name = options
        .dataset_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .or_else(|| options.file_name.as_deref().map(file_stem))
        .unwrap_or_else(generated_name);

    let dataset = ProcessedDataset {
        dataset_name,
        original_file_name: options.file_name.clone().unwrap_or_default(),
        imported_by: options.imported_by.clone(),
        currency,
        dataset_type: options
            .dataset_type
            .clone()
            .unwrap_or_else(|| DEFAULT_DATASET_TYPE.to_string()),
        movements,
        period_start,
        period_end,
    };

    Ok(DatasetBuildResult {
        dataset,
        row_errors,
    })
}

/// Merge datasets into one, recomputing period bounds
///
/// A single dataset merges to itself unchanged. The first non-default
/// currency and dataset type across the set win.
pub fn merge_datasets(datasets: &[ProcessedDataset]) -> Result<ProcessedDataset> {
    let Some(first) = datasets.first() else {
        return Err(Error::validation("no datasets to merge"));
    };

    if datasets.len() == 1 {
        return Ok(first.clone());
    }

    let movements: Vec<Movement> = datasets
        .iter()
        .flat_map(|d| d.movements.iter().cloned())
        .collect();
    let (period_start, period_end) = period_bounds(&movements);

    let currency = datasets
        .iter()
        .find(|d| d.currency != DEFAULT_CURRENCY)
        .map(|d| d.currency.clone())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let dataset_type = datasets
        .iter()
        .find(|d| d.dataset_type != DEFAULT_DATASET_TYPE)
        .map(|d| d.dataset_type.clone())
        .unwrap_or_else(|| DEFAULT_DATASET_TYPE.to_string());

    let file_names: Vec<&str> = datasets
        .iter()
        .map(|d| d.original_file_name.as_str())
        .filter(|n| !n.is_empty())
        .collect();

    Ok(ProcessedDataset {
        dataset_name: first.dataset_name.clone(),
        original_file_name: file_names.join(", "),
        imported_by: datasets.iter().find_map(|d| d.imported_by.clone()),
        currency,
        dataset_type,
        movements,
        period_start,
        period_end,
    })
}

/// Predicates for [`filter_dataset`]; every present predicate must hold
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFilter {
    /// Inclusive lower bound, literal `DD/MM/YYYY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    /// Inclusive upper bound, literal `DD/MM/YYYY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directions: Option<Vec<Direction>>,
    /// Category group names, matched case-insensitively
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// New dataset containing only the movements satisfying all predicates
///
/// Unlike the builder, filtering may legitimately produce zero movements;
/// period bounds are `None` in that case.
pub fn filter_dataset(dataset: &ProcessedDataset, filter: &DatasetFilter) -> ProcessedDataset {
    let movements: Vec<Movement> = dataset
        .movements
        .iter()
        .filter(|m| matches_filter(m, filter))
        .cloned()
        .collect();
    let (period_start, period_end) = period_bounds(&movements);

    ProcessedDataset {
        movements,
        period_start,
        period_end,
        ..dataset.clone()
    }
}

fn matches_filter(movement: &Movement, filter: &DatasetFilter) -> bool {
    let key = sortable_date_key(&movement.date);

    if let Some(from) = &filter.date_from {
        if key < sortable_date_key(from) {
            return false;
        }
    }
    if let Some(to) = &filter.date_to {
        if key > sortable_date_key(to) {
            return false;
        }
    }
    if let Some(min) = filter.min_amount {
        if movement.amount < min {
            return false;
        }
    }
    if let Some(max) = filter.max_amount {
        if movement.amount > max {
            return false;
        }
    }
    if let Some(directions) = &filter.directions {
        if !directions.contains(&movement.direction) {
            return false;
        }
    }
    if let Some(categories) = &filter.categories {
        if !categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&movement.category.group))
        {
            return false;
        }
    }

    true
}

/// Derived statistics over a dataset's movements
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatistics {
    pub total_movements: usize,
    pub total_amount: Decimal,
    pub average_amount: Decimal,
    pub ingreso_count: usize,
    pub ingreso_total: Decimal,
    pub egreso_count: usize,
    pub egreso_total: Decimal,
    /// `ingreso_total - egreso_total`
    pub net_balance: Decimal,
}

pub fn calculate_dataset_statistics(dataset: &ProcessedDataset) -> DatasetStatistics {
    let mut ingreso_count = 0;
    let mut ingreso_total = Decimal::ZERO;
    let mut egreso_count = 0;
    let mut egreso_total = Decimal::ZERO;

    for movement in &dataset.movements {
        match movement.direction {
            Direction::Ingreso => {
                ingreso_count += 1;
                ingreso_total += movement.amount;
            }
            Direction::Egreso => {
                egreso_count += 1;
                egreso_total += movement.amount;
            }
        }
    }

    let total_movements = dataset.movements.len();
    let total_amount = ingreso_total + egreso_total;
    let average_amount = if total_movements > 0 {
        total_amount / Decimal::from(total_movements as u64)
    } else {
        Decimal::ZERO
    };

    DatasetStatistics {
        total_movements,
        total_amount,
        average_amount,
        ingreso_count,
        ingreso_total,
        egreso_count,
        egreso_total,
        net_balance: ingreso_total - egreso_total,
    }
}

/// Min and max movement dates under the sortable key, as literal strings
fn period_bounds(movements: &[Movement]) -> (Option<String>, Option<String>) {
    let start = movements
        .iter()
        .min_by_key(|m| sortable_date_key(&m.date))
        .map(|m| m.date.clone());
    let end = movements
        .iter()
        .max_by_key(|m| sortable_date_key(&m.date))
        .map(|m| m.date.clone());
    (start, end)
}

/// File name minus its extension
fn file_stem(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

/// Date-stamped fallback name
fn generated_name() -> String {
    format!("importacion_{}", Utc::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;

    fn row(date: &str, category: &str, amount: i64, currency: &str) -> CsvRow {
        CsvRow {
            date: date.to_string(),
            category: category.to_string(),
            amount: Decimal::new(amount, 0),
            currency: currency.to_string(),
            ..Default::default()
        }
    }

    fn movement(date: &str, direction: Direction, amount: i64) -> Movement {
        Movement {
            date: date.to_string(),
            category: Category::new("Varios", None),
            direction,
            amount: Decimal::new(amount, 0),
            note: None,
            external_id: None,
            balance: None,
        }
    }

    fn dataset(movements: Vec<Movement>) -> ProcessedDataset {
        let (period_start, period_end) = period_bounds(&movements);
        ProcessedDataset {
            dataset_name: "test".to_string(),
            original_file_name: "test.csv".to_string(),
            imported_by: None,
            currency: DEFAULT_CURRENCY.to_string(),
            dataset_type: DEFAULT_DATASET_TYPE.to_string(),
            movements,
            period_start,
            period_end,
        }
    }

    #[test]
    fn test_sortable_date_key() {
        assert_eq!(sortable_date_key("01/01/2024"), "20240101");
        assert_eq!(sortable_date_key("5/3/24"), "240305");
        assert_eq!(sortable_date_key("15/12/2023"), "20231215");
        assert_eq!(sortable_date_key("not-a-date"), "not-a-date");
    }

    #[test]
    fn test_build_dataset_basic() {
        let rows = vec![
            row("15/03/2024", "Comida:Super", -250, "ARS"),
            row("01/01/2024", "Sueldo", 90000, ""),
            row("20/06/2024", "Transporte", -120, ""),
        ];
        let result = build_dataset_from_csv_rows(
            &rows,
            &DatasetOptions {
                file_name: Some("movimientos-2024.csv".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(result.dataset.movements.len(), 3);
        assert!(result.row_errors.is_empty());
        assert_eq!(result.dataset.dataset_name, "movimientos-2024");
        assert_eq!(result.dataset.currency, "ARS");
        assert_eq!(result.dataset.period_start.as_deref(), Some("01/01/2024"));
        assert_eq!(result.dataset.period_end.as_deref(), Some("20/06/2024"));
    }

    #[test]
    fn test_build_dataset_collects_row_errors() {
        let rows = vec![
            row("01/01/2024", "Comida", -100, ""),
            row("", "Comida", -100, ""),      // no date
            row("01/01/2024", "", -100, ""),  // no category
            row("01/01/2024", "Comida", 0, ""), // zero amount
        ];
        let result =
            build_dataset_from_csv_rows(&rows, &DatasetOptions::default()).unwrap();

        assert_eq!(result.dataset.movements.len(), 1);
        assert_eq!(result.row_errors.len(), 3);
    }

    #[test]
    fn test_build_dataset_zero_movements_is_fatal() {
        let rows = vec![row("", "", 0, "")];
        let err = build_dataset_from_csv_rows(&rows, &DatasetOptions::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyDataset(_)));
    }

    #[test]
    fn test_build_dataset_name_override_beats_file_stem() {
        let rows = vec![row("01/01/2024", "Comida", -100, "")];
        let result = build_dataset_from_csv_rows(
            &rows,
            &DatasetOptions {
                dataset_name: Some("Gastos enero".to_string()),
                file_name: Some("raw.csv".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(result.dataset.dataset_name, "Gastos enero");
    }

    #[test]
    fn test_build_dataset_generated_name_without_file() {
        let rows = vec![row("01/01/2024", "Comida", -100, "")];
        let result =
            build_dataset_from_csv_rows(&rows, &DatasetOptions::default()).unwrap();
        assert!(result.dataset.dataset_name.starts_with("importacion_"));
    }

    #[test]
    fn test_build_dataset_currency_from_first_nonempty() {
        let rows = vec![
            row("01/01/2024", "Comida", -100, ""),
            row("02/01/2024", "Comida", -100, "usd"),
            row("03/01/2024", "Comida", -100, "EUR"),
        ];
        let result =
            build_dataset_from_csv_rows(&rows, &DatasetOptions::default()).unwrap();
        assert_eq!(result.dataset.currency, "USD");
    }

    #[test]
    fn test_period_invariant() {
        let rows = vec![
            row("09/10/2024", "A", 1, ""),
            row("10/09/2024", "A", 1, ""),
            row("01/01/2025", "A", 1, ""),
        ];
        let result =
            build_dataset_from_csv_rows(&rows, &DatasetOptions::default()).unwrap();
        let start = result.dataset.period_start.unwrap();
        let end = result.dataset.period_end.unwrap();
        assert!(sortable_date_key(&start) <= sortable_date_key(&end));
        assert_eq!(start, "10/09/2024");
        assert_eq!(end, "01/01/2025");
    }

    #[test]
    fn test_merge_single_dataset_is_identity() {
        let d = dataset(vec![movement("01/01/2024", Direction::Ingreso, 100)]);
        let merged = merge_datasets(std::slice::from_ref(&d)).unwrap();
        assert_eq!(merged, d);
    }

    #[test]
    fn test_merge_concatenates_and_recomputes_bounds() {
        let d1 = dataset(vec![
            movement("05/02/2024", Direction::Egreso, 50),
            movement("10/02/2024", Direction::Ingreso, 100),
        ]);
        let mut d2 = dataset(vec![movement("01/01/2024", Direction::Egreso, 75)]);
        d2.currency = "USD".to_string();

        let merged = merge_datasets(&[d1.clone(), d2]).unwrap();
        assert_eq!(
            merged.movements.len(),
            d1.movements.len() + 1
        );
        assert_eq!(merged.period_start.as_deref(), Some("01/01/2024"));
        assert_eq!(merged.period_end.as_deref(), Some("10/02/2024"));
        // first non-default currency wins
        assert_eq!(merged.currency, "USD");
    }

    #[test]
    fn test_merge_empty_list_is_an_error() {
        assert!(merge_datasets(&[]).is_err());
    }

    #[test]
    fn test_filter_by_date_range_and_direction() {
        let d = dataset(vec![
            movement("01/01/2024", Direction::Ingreso, 100),
            movement("15/01/2024", Direction::Egreso, 50),
            movement("01/02/2024", Direction::Egreso, 75),
        ]);
        let filter = DatasetFilter {
            date_from: Some("10/01/2024".to_string()),
            date_to: Some("31/01/2024".to_string()),
            directions: Some(vec![Direction::Egreso]),
            ..Default::default()
        };
        let filtered = filter_dataset(&d, &filter);

        assert_eq!(filtered.movements.len(), 1);
        assert_eq!(filtered.movements[0].date, "15/01/2024");
        assert_eq!(filtered.period_start.as_deref(), Some("15/01/2024"));
        assert_eq!(filtered.period_end.as_deref(), Some("15/01/2024"));
    }

    #[test]
    fn test_filter_by_amount_and_category() {
        let mut m1 = movement("01/01/2024", Direction::Egreso, 500);
        m1.category = Category::new("Comida", None);
        let mut m2 = movement("02/01/2024", Direction::Egreso, 20);
        m2.category = Category::new("Comida", None);
        let mut m3 = movement("03/01/2024", Direction::Egreso, 900);
        m3.category = Category::new("Hogar", None);
        let d = dataset(vec![m1, m2, m3]);

        let filter = DatasetFilter {
            min_amount: Some(Decimal::new(100, 0)),
            categories: Some(vec!["comida".to_string()]),
            ..Default::default()
        };
        let filtered = filter_dataset(&d, &filter);
        assert_eq!(filtered.movements.len(), 1);
        assert_eq!(filtered.movements[0].amount, Decimal::new(500, 0));
    }

    #[test]
    fn test_filter_to_empty_clears_bounds() {
        let d = dataset(vec![movement("01/01/2024", Direction::Ingreso, 100)]);
        let filter = DatasetFilter {
            min_amount: Some(Decimal::new(1000, 0)),
            ..Default::default()
        };
        let filtered = filter_dataset(&d, &filter);
        assert!(filtered.movements.is_empty());
        assert!(filtered.period_start.is_none());
        assert!(filtered.period_end.is_none());
    }

    #[test]
    fn test_statistics() {
        let d = dataset(vec![
            movement("01/01/2024", Direction::Ingreso, 1000),
            movement("02/01/2024", Direction::Egreso, 300),
            movement("03/01/2024", Direction::Egreso, 200),
            movement("04/01/2024", Direction::Ingreso, 500),
        ]);
        let stats = calculate_dataset_statistics(&d);

        assert_eq!(stats.total_movements, 4);
        assert_eq!(stats.total_amount, Decimal::new(2000, 0));
        assert_eq!(stats.average_amount, Decimal::new(500, 0));
        assert_eq!(stats.ingreso_count, 2);
        assert_eq!(stats.ingreso_total, Decimal::new(1500, 0));
        assert_eq!(stats.egreso_count, 2);
        assert_eq!(stats.egreso_total, Decimal::new(500, 0));
        assert_eq!(stats.net_balance, Decimal::new(1000, 0));
    }
}
