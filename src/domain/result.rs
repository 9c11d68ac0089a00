//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Only structural problems become an `Error`: an invalid column mapping, a
/// file that yields no usable rows, a dataset with zero movements. Per-row
/// problems are collected as strings on the result structs instead, so a bad
/// line never aborts the file it came from.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a mapping error
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping(msg.into())
    }

    /// Create an empty-dataset error
    pub fn empty_dataset(msg: impl Into<String>) -> Self {
        Self::EmptyDataset(msg.into())
    }

    /// Create a source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a submission error
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
