//! Core domain entities
//!
//! Pure data structures for the ingestion pipeline - no I/O and no external
//! dependencies. Every entity here is created fresh per processing run and
//! owned by exactly one pipeline stage at a time.

mod dataset;
mod movement;
mod row;
pub mod result;

pub use dataset::{BatchInfo, ProcessedDataset, DEFAULT_CURRENCY, DEFAULT_DATASET_TYPE};
pub use movement::{ApiMovement, Category, Direction, Movement};
pub use row::CsvRow;
