//! Integration tests for the ingestion pipeline
//!
//! These tests run the pipeline end to end over in-memory sources. Ports
//! (file acquisition, batch submission) are mocked at the trait level; every
//! stage in between runs for real.
//!
//! Run with: cargo test --test pipeline_tests -- --nocapture

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use movimientos_core::domain::result::{Error, Result};
use movimientos_core::domain::{BatchInfo, Category, Direction, Movement, ProcessedDataset};
use movimientos_core::ports::{BatchSubmitter, FileSource};
use movimientos_core::services::{
    create_batches, merge_datasets, normalize_date, process_dataset_in_batches, sortable_date_key,
    BatchConfig, FileProcessor, Tokenizer,
};
use movimientos_core::ProcessOptions;

// ============================================================================
// Test Helpers
// ============================================================================

const HEADER: &str = "Identificador,Fecha,Estado,Tipo,Cuenta,Beneficiario,Categoria,Importe,Divisa,Numero,Notas";

struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            files: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl FileSource for MemorySource {
    async fn read_to_string(&self, name: &str) -> Result<String> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| Error::source(format!("file '{name}' not found")))
    }
}

/// Records every submitted batch; optionally fails a fixed batch number once.
struct RecordingSubmitter {
    batches: Mutex<Vec<BatchInfo>>,
    fail_once: Option<usize>,
    failures_left: AtomicUsize,
}

impl RecordingSubmitter {
    fn new() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail_once: None,
            failures_left: AtomicUsize::new(0),
        }
    }

    fn failing_once(batch_number: usize) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail_once: Some(batch_number),
            failures_left: AtomicUsize::new(1),
        }
    }
}

#[async_trait]
impl BatchSubmitter for RecordingSubmitter {
    async fn submit(&self, batch: &BatchInfo) -> Result<()> {
        if self.fail_once == Some(batch.batch_number)
            && self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(Error::submission("simulated transport failure"));
        }
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
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

fn dataset(name: &str, movements: Vec<Movement>) -> ProcessedDataset {
    ProcessedDataset {
        dataset_name: name.to_string(),
        original_file_name: format!("{name}.csv"),
        imported_by: None,
        currency: "ARS".to_string(),
        dataset_type: "movimientos".to_string(),
        movements,
        period_start: None,
        period_end: None,
    }
}

async fn process_one(content: &str) -> movimientos_core::ProcessingResult {
    let source = MemorySource::new(&[("archivo.csv", content)]);
    FileProcessor::new()
        .process_files(
            &source,
            &["archivo.csv".to_string()],
            &ProcessOptions::default(),
            None,
        )
        .await
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

/// Header plus one data line must produce exactly the expected movement,
/// including the two-digit year expansion and the subdivided category.
#[tokio::test]
async fn test_end_to_end_single_movement() {
    let content = format!(
        "{HEADER}\n1,01/01/24,ok,,Cuenta1,Juan,Comida:Super,-250,ARS,,Compra semanal"
    );
    let result = process_one(&content).await;

    assert!(result.success, "errors: {:?}", result.errors);
    let dataset = result.dataset.unwrap();
    assert_eq!(dataset.movements.len(), 1);

    let m = &dataset.movements[0];
    assert_eq!(m.date, "01/01/2024");
    assert_eq!(m.category.group, "Comida");
    assert_eq!(m.category.subgroup.as_deref(), Some("Super"));
    assert_eq!(m.direction, Direction::Egreso);
    assert_eq!(m.amount, Decimal::new(250, 0));
    assert_eq!(m.note.as_deref(), Some("Compra semanal"));
}

/// The serialized movement carries the Spanish wire keys consumers expect.
#[tokio::test]
async fn test_end_to_end_wire_shape() {
    let content = format!(
        "{HEADER}\n1,01/01/24,ok,,Cuenta1,Juan,Comida:Super,-250,ARS,,Compra semanal"
    );
    let result = process_one(&content).await;
    let dataset = result.dataset.unwrap();
    let json = serde_json::to_value(&dataset.movements[0]).unwrap();

    assert_eq!(json["fecha"], "01/01/2024");
    assert_eq!(json["categoria"]["grupo"], "Comida");
    assert_eq!(json["categoria"]["subgrupo"], "Super");
    assert_eq!(json["tipo"], "egreso");
    assert_eq!(json["monto"], serde_json::json!("250"));
    assert_eq!(json["nota"], "Compra semanal");
}

// ============================================================================
// Comma Disambiguation
// ============================================================================

/// A line with an embedded comma in the category column, no quoting, must
/// still come out with the expected column count and the comma intact.
#[test]
fn test_comma_disambiguation_fixture() {
    let tokenizer = Tokenizer::new();
    let tokens = tokenizer.tokenize_smart("2024-code,Food: Groceries, extra,150.50,ARS", 4, None);

    assert_eq!(tokens.len(), 4);
    assert_eq!(tokens[1], "Food: Groceries, extra");
    assert_eq!(tokens[2], "150.50");
}

/// The same protection holds across the full pipeline: an unquoted embedded
/// comma in the category must not shift the amount column.
#[tokio::test]
async fn test_embedded_comma_survives_pipeline() {
    let content = format!(
        "{HEADER}\n1,05/03/2024,ok,,Cuenta1,Juan,Comida: frutas, verduras,-300,ARS,,Feria"
    );
    let result = process_one(&content).await;

    assert!(result.success, "errors: {:?}", result.errors);
    let m = &result.dataset.unwrap().movements[0];
    assert_eq!(m.amount, Decimal::new(300, 0));
    assert_eq!(m.category.group, "Comida");
    assert_eq!(m.category.subgroup.as_deref(), Some("frutas, verduras"));
}

// ============================================================================
// Invariants
// ============================================================================

/// Movement amounts are strictly positive regardless of the sign in the input.
#[tokio::test]
async fn test_amount_invariant() {
    let content = format!(
        "{HEADER}\n\
         1,01/01/2024,ok,,C,Juan,Comida,-250,ARS,,\n\
         2,02/01/2024,ok,,C,Empresa,Sueldo,90000,ARS,,\n\
         3,03/01/2024,ok,,C,Juan,Hogar,-0.50,ARS,,"
    );
    let result = process_one(&content).await;
    let dataset = result.dataset.unwrap();

    assert_eq!(dataset.movements.len(), 3);
    for m in &dataset.movements {
        assert!(m.amount > Decimal::ZERO, "non-positive amount: {}", m.amount);
    }
}

/// Dates pass through as literal strings; only padding and the century prefix
/// touch them.
#[test]
fn test_date_preservation() {
    assert_eq!(normalize_date("5/3/24"), "05/03/2024");
    assert_eq!(normalize_date("05/03/2024"), "05/03/2024");
    assert_eq!(normalize_date("31/12/2023"), "31/12/2023");
    // unrecognized shapes stay untouched rather than being guessed at
    assert_eq!(normalize_date("2024-03-05"), "2024-03-05");
}

/// Period bounds never invert, including across month and year boundaries
/// where lexicographic DD/MM ordering would lie.
#[tokio::test]
async fn test_period_invariant() {
    let content = format!(
        "{HEADER}\n\
         1,09/10/2024,ok,,C,J,A,-1,ARS,,\n\
         2,10/09/2024,ok,,C,J,A,-1,ARS,,\n\
         3,01/01/2025,ok,,C,J,A,-1,ARS,,"
    );
    let result = process_one(&content).await;
    let dataset = result.dataset.unwrap();

    let start = dataset.period_start.unwrap();
    let end = dataset.period_end.unwrap();
    assert_eq!(start, "10/09/2024");
    assert_eq!(end, "01/01/2025");
    assert!(sortable_date_key(&start) <= sortable_date_key(&end));
}

/// Batching partitions the dataset completely: sizes sum to the movement
/// count and the batch count is ceil(M / B).
#[test]
fn test_batch_partition_completeness() {
    for (movements, batch_size) in [(1usize, 50usize), (50, 50), (51, 50), (120, 7), (23, 10)] {
        let d = dataset(
            "particion",
            (0..movements)
                .map(|i| movement("01/01/2024", Direction::Egreso, i as i64 + 1))
                .collect(),
        );
        let batches = create_batches(&d, batch_size);

        assert_eq!(batches.len(), movements.div_ceil(batch_size));
        assert_eq!(batches.iter().map(|b| b.size).sum::<usize>(), movements);
        for pair in batches.windows(2) {
            assert_eq!(pair[0].end_index, pair[1].start_index);
        }
    }
}

/// Merging a dataset with itself conceptually: a singleton merge is identity.
#[test]
fn test_merge_idempotence() {
    let d = dataset(
        "solo",
        vec![
            movement("01/01/2024", Direction::Ingreso, 100),
            movement("15/01/2024", Direction::Egreso, 40),
        ],
    );
    let merged = merge_datasets(std::slice::from_ref(&d)).unwrap();
    assert_eq!(merged, d);
}

// ============================================================================
// Dispatch Over Real Datasets
// ============================================================================

/// Full path: parse, build, dispatch. Every movement reaches the submitter
/// exactly once and batch numbering is stable.
#[tokio::test]
async fn test_process_and_dispatch() {
    let lines: Vec<String> = (1..=12)
        .map(|i| format!("{i},{:02}/01/2024,ok,,C,Juan,Comida,-{},ARS,,", (i % 28) + 1, i * 10))
        .collect();
    let content = format!("{HEADER}\n{}", lines.join("\n"));
    let source = MemorySource::new(&[("enero.csv", &content)]);
    let submitter = RecordingSubmitter::new();

    let result = FileProcessor::new()
        .process_and_dispatch(
            &source,
            &["enero.csv".to_string()],
            &ProcessOptions::default(),
            &BatchConfig {
                batch_size: 5,
                delay_between_batches_ms: None,
                max_retries: 0,
                retry_delay_ms: 0,
            },
            &submitter,
            None,
        )
        .await;

    assert!(result.processing.success);
    let dispatch = result.dispatch.unwrap();
    assert!(dispatch.success);
    assert_eq!(dispatch.total_batches, 3);
    assert_eq!(dispatch.processed_movements, 12);

    let batches = submitter.batches.lock().unwrap();
    assert_eq!(batches.iter().map(|b| b.size).sum::<usize>(), 12);
    assert_eq!(
        batches.iter().map(|b| b.batch_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

/// A transient submission failure is retried and leaves no residual error.
#[tokio::test]
async fn test_dispatch_retries_transient_failure() {
    let d = dataset(
        "reintento",
        (0..10)
            .map(|i| movement("01/01/2024", Direction::Egreso, i + 1))
            .collect(),
    );
    let submitter = RecordingSubmitter::failing_once(2);
    let config = BatchConfig {
        batch_size: 5,
        delay_between_batches_ms: None,
        max_retries: 2,
        retry_delay_ms: 0,
    };

    let result = process_dataset_in_batches(&d, &config, &submitter, None).await;

    assert!(result.success);
    assert_eq!(result.successful_batches, 2);
    assert_eq!(result.processed_movements, 10);
    assert!(result.errors.is_empty());
    assert_eq!(submitter.batches.lock().unwrap().len(), 2);
}
