//! Batch dispatcher
//!
//! Splits a dataset into contiguous batches and submits them sequentially
//! through a [`BatchSubmitter`] port, with bounded retries per batch. A
//! failed batch never aborts the run; the dispatcher keeps going and reports
//! per-batch errors at the end.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{BatchInfo, ProcessedDataset};
use crate::ports::{BatchProgress, BatchSubmitter, ProgressObserver};

/// Dispatch tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    /// Movements per batch; the last batch may be smaller
    pub batch_size: usize,
    /// Pause between consecutive batches, skipped after the last one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_between_batches_ms: Option<u64>,
    /// Additional attempts after the first failed submission
    pub max_retries: u32,
    /// Pause before each retry attempt
    pub retry_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            delay_between_batches_ms: None,
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

/// Outcome of a full dispatcher run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProcessingResult {
    /// True only when every batch eventually succeeded
    pub success: bool,
    pub total_batches: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
    /// Movements in the batches that succeeded
    pub processed_movements: usize,
    pub errors: Vec<String>,
    pub elapsed_ms: u64,
}

/// Partition a dataset's movements into contiguous 1-based batches
///
/// Returns an empty vec when `batch_size` is zero; the dispatcher turns that
/// into a failed run rather than dividing by zero.
pub fn create_batches(dataset: &ProcessedDataset, batch_size: usize) -> Vec<BatchInfo> {
    if batch_size == 0 {
        return Vec::new();
    }

    dataset
        .movements
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| {
            let start_index = i * batch_size;
            BatchInfo {
                batch_number: i + 1,
                movements: chunk.to_vec(),
                size: chunk.len(),
                start_index,
                end_index: start_index + chunk.len(),
            }
        })
        .collect()
}

/// Submit an entire dataset batch by batch
///
/// Sequential on purpose: receiving ends of this pipeline are order-sensitive
/// and rate-limited. Each batch gets up to `1 + max_retries` attempts; errors
/// from attempts that were later retried successfully are dropped from the
/// final report.
pub async fn process_dataset_in_batches(
    dataset: &ProcessedDataset,
    config: &BatchConfig,
    submitter: &dyn BatchSubmitter,
    observer: Option<&dyn ProgressObserver>,
) -> BatchProcessingResult {
    let started = Instant::now();

    if config.batch_size == 0 {
        return BatchProcessingResult {
            success: false,
            total_batches: 0,
            successful_batches: 0,
            failed_batches: 0,
            processed_movements: 0,
            errors: vec!["batch size must be greater than zero".to_string()],
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
    }

    let batches = create_batches(dataset, config.batch_size);
    let total_batches = batches.len();
    info!(
        dataset = %dataset.dataset_name,
        movements = dataset.movements.len(),
        total_batches,
        batch_size = config.batch_size,
        "dispatching dataset in batches"
    );

    let mut successful_batches = 0;
    let mut failed_batches = 0;
    let mut processed_movements = 0;
    let mut errors: Vec<String> = Vec::new();

    for batch in &batches {
        let prefix = format!("batch {}:", batch.batch_number);
        let mut succeeded = false;

        for attempt in 0..=config.max_retries {
            if attempt > 0 {
                debug!(
                    batch = batch.batch_number,
                    attempt,
                    "retrying batch submission"
                );
                tokio::time::sleep(Duration::from_millis(config.retry_delay_ms)).await;
            }

            match submitter.submit(batch).await {
                Ok(()) => {
                    succeeded = true;
                    break;
                }
                Err(err) => {
                    warn!(
                        batch = batch.batch_number,
                        attempt,
                        error = %err,
                        "batch submission failed"
                    );
                    errors.push(format!("{prefix} {err}"));
                }
            }
        }

        if succeeded {
            successful_batches += 1;
            processed_movements += batch.size;
            // earlier attempts of this batch no longer matter
            errors.retain(|e| !e.starts_with(&prefix));
        } else {
            failed_batches += 1;
        }

        if let Some(observer) = observer {
            let completed = successful_batches + failed_batches;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            observer.on_batch_completed(&BatchProgress {
                completed_batches: completed,
                total_batches,
                successful_batches,
                failed_batches,
                processed_movements,
                elapsed_ms,
                estimated_remaining_ms: estimate_remaining(elapsed_ms, completed, total_batches),
            });
        }

        if let Some(delay) = config.delay_between_batches_ms {
            if batch.batch_number < total_batches {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        dataset = %dataset.dataset_name,
        successful_batches,
        failed_batches,
        processed_movements,
        elapsed_ms,
        "batch dispatch finished"
    );

    BatchProcessingResult {
        success: failed_batches == 0,
        total_batches,
        successful_batches,
        failed_batches,
        processed_movements,
        errors,
        elapsed_ms,
    }
}

/// Linear projection from average batch duration so far
fn estimate_remaining(elapsed_ms: u64, completed: usize, total: usize) -> u64 {
    if completed == 0 || total <= completed {
        return 0;
    }
    elapsed_ms / completed as u64 * (total - completed) as u64
}
