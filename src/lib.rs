//! Movimientos Core - CSV ingestion pipeline for financial movement data
//!
//! This crate implements the ingestion core following hexagonal architecture:
//!
//! - **domain**: Core entities (Movement, CsvRow, ProcessedDataset, BatchInfo)
//! - **ports**: Trait definitions for external dependencies (FileSource,
//!   BatchSubmitter, ProgressObserver)
//! - **services**: Pipeline stages - tokenizer, parsers, normalizer, dataset
//!   builder, batch dispatcher, and the multi-file processor tying them together
//!
//! The pipeline turns loosely structured CSV exports (header or headerless,
//! positional or mapping-driven, with embedded commas in free-text columns)
//! into validated movement datasets ready for batched submission.

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod ports;
pub mod services;

// Re-export commonly used types at crate root
pub use config::{ColumnCommasConfig, ColumnDefinition, MappingConfig, ProcessOptions};
pub use diagnostics::{OverflowResolution, TraceEvent};
pub use domain::result::{Error, Result};
pub use domain::{
    ApiMovement, BatchInfo, Category, CsvRow, Direction, Movement, ProcessedDataset,
};
pub use services::{BatchConfig, BatchProcessingResult, FileProcessor, ProcessingResult};
