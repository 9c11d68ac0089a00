//! Multi-file processing orchestration
//!
//! Reads every requested file through the [`FileSource`] port concurrently,
//! then parses, builds and merges sequentially so per-file reports stay in
//! request order. Parsing strategy is chosen per run: an explicit mapping
//! wins over declared column definitions, which win over the positional
//! fallback.

use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::ProcessOptions;
use crate::diagnostics::TraceEvent;
use crate::domain::ProcessedDataset;
use crate::ports::{BatchSubmitter, FileProgress, FileSource, ProgressObserver};
use crate::services::batch::{process_dataset_in_batches, BatchConfig, BatchProcessingResult};
use crate::services::dataset::{build_dataset_from_csv_rows, merge_datasets, DatasetOptions};
use crate::services::mapping_parser::MappingParser;
use crate::services::row_parser::{ParseOutcome, RowParser};

/// Per-file report within a processing run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file_name: String,
    pub success: bool,
    pub rows: usize,
    pub movements: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub trace: Vec<TraceEvent>,
}

/// Outcome of a full multi-file processing run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    /// True when every file produced a dataset and at least one row parsed
    pub success: bool,
    /// Merged dataset; `None` when no file yielded movements
    pub dataset: Option<ProcessedDataset>,
    pub files: Vec<FileReport>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub total_rows: usize,
    pub total_movements: usize,
    pub elapsed_ms: u64,
}

/// Processing plus dispatch in one call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessAndDispatchResult {
    pub processing: ProcessingResult,
    /// `None` when processing produced no dataset to dispatch
    pub dispatch: Option<BatchProcessingResult>,
}

/// Orchestrates parsing, normalization and dataset assembly across files
pub struct FileProcessor {
    row_parser: RowParser,
    mapping_parser: MappingParser,
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FileProcessor {
    pub fn new() -> Self {
        Self {
            row_parser: RowParser::new(),
            mapping_parser: MappingParser::new(),
        }
    }

    /// Process every named file into one merged dataset
    ///
    /// File reads run concurrently; a file that fails to read or parse marks
    /// the run unsuccessful but never stops the remaining files.
    #[instrument(skip_all, fields(files = file_names.len()))]
    pub async fn process_files(
        &self,
        source: &dyn FileSource,
        file_names: &[String],
        options: &ProcessOptions,
        observer: Option<&dyn ProgressObserver>,
    ) -> ProcessingResult {
        let started = Instant::now();

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut files = Vec::with_capacity(file_names.len());
        let mut datasets = Vec::new();
        let mut total_rows = 0;
        let mut total_movements = 0;

        if file_names.is_empty() {
            errors.push("no files to process".to_string());
        }

        let contents = join_all(
            file_names
                .iter()
                .map(|name| source.read_to_string(name)),
        )
        .await;

        for (index, (file_name, content)) in file_names.iter().zip(contents).enumerate() {
            let file_started = Instant::now();
            let report = match content {
                Ok(content) => {
                    let outcome = self.parse(&content, options);
                    self.assemble(file_name, outcome, options, &mut datasets)
                }
                Err(err) => {
                    warn!(file = %file_name, error = %err, "file read failed");
                    FileReport {
                        file_name: file_name.clone(),
                        success: false,
                        rows: 0,
                        movements: 0,
                        errors: vec![format!("read failed: {err}")],
                        warnings: Vec::new(),
                        trace: Vec::new(),
                    }
                }
            };

            total_rows += report.rows;
            total_movements += report.movements;
            for error in &report.errors {
                errors.push(format!("{}: {}", file_name, error));
            }
            for warning in &report.warnings {
                warnings.push(format!("{}: {}", file_name, warning));
            }

            if let Some(observer) = observer {
                observer.on_file_completed(&FileProgress {
                    completed_files: index + 1,
                    total_files: file_names.len(),
                    file_name: file_name.clone(),
                    rows: report.rows,
                    success: report.success,
                    elapsed_ms: file_started.elapsed().as_millis() as u64,
                });
            }

            files.push(report);
        }

        let all_files_ok = !files.is_empty() && files.iter().all(|f| f.success);

        let dataset = if datasets.is_empty() {
            None
        } else {
            match merge_datasets(&datasets) {
                Ok(mut merged) => {
                    if let Some(name) = options
                        .dataset_name
                        .as_deref()
                        .filter(|n| !n.trim().is_empty())
                    {
                        merged.dataset_name = name.to_string();
                    }
                    Some(merged)
                }
                Err(err) => {
                    errors.push(format!("merge failed: {err}"));
                    None
                }
            }
        };

        let success = all_files_ok && total_rows > 0 && dataset.is_some();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            files = files.len(),
            total_rows,
            total_movements,
            success,
            elapsed_ms,
            "processing run finished"
        );

        ProcessingResult {
            success,
            dataset,
            files,
            errors,
            warnings,
            total_rows,
            total_movements,
            elapsed_ms,
        }
    }

    /// Process files and, when a dataset comes out, dispatch it in batches
    pub async fn process_and_dispatch(
        &self,
        source: &dyn FileSource,
        file_names: &[String],
        options: &ProcessOptions,
        batch_config: &BatchConfig,
        submitter: &dyn BatchSubmitter,
        observer: Option<&dyn ProgressObserver>,
    ) -> ProcessAndDispatchResult {
        let processing = self
            .process_files(source, file_names, options, observer)
            .await;

        let dispatch = match &processing.dataset {
            Some(dataset) => {
                Some(process_dataset_in_batches(dataset, batch_config, submitter, observer).await)
            }
            None => None,
        };

        ProcessAndDispatchResult {
            processing,
            dispatch,
        }
    }

    fn parse(&self, content: &str, options: &ProcessOptions) -> ParseOutcome {
        match &options.mapping {
            Some(mapping) => self.mapping_parser.parse_content_with_mapping(content, mapping),
            None => self
                .row_parser
                .parse_content(content, options.column_definitions.as_deref()),
        }
    }

    /// Build a dataset from one file's parse outcome and stash it for the
    /// final merge. The dataset name override is applied after merging, not
    /// per file, so intermediate names stay traceable to their files.
    fn assemble(
        &self,
        file_name: &str,
        outcome: ParseOutcome,
        options: &ProcessOptions,
        datasets: &mut Vec<ProcessedDataset>,
    ) -> FileReport {
        let rows = outcome.rows.len();
        let mut errors = outcome.errors;
        let mut warnings = outcome.warnings;

        let movements = if rows > 0 {
            let build = build_dataset_from_csv_rows(
                &outcome.rows,
                &DatasetOptions {
                    dataset_name: None,
                    file_name: Some(file_name.to_string()),
                    imported_by: options.imported_by.clone(),
                    dataset_type: options.dataset_type.clone(),
                },
            );
            match build {
                Ok(result) => {
                    warnings.extend(result.row_errors);
                    let count = result.dataset.movements.len();
                    datasets.push(result.dataset);
                    count
                }
                Err(err) => {
                    errors.push(err.to_string());
                    0
                }
            }
        } else {
            0
        };

        FileReport {
            file_name: file_name.to_string(),
            success: errors.is_empty(),
            rows,
            movements,
            errors,
            warnings,
            trace: outcome.trace,
        }
    }
}
