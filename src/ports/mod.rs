//! Port definitions (hexagonal architecture)
//!
//! The core depends only on these traits. File acquisition, persistence
//! transport, and progress rendering all live outside the crate; rejection of
//! a batch submission is the only thing the core learns about the transport.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::BatchInfo;

/// Text-content acquisition
///
/// Implementations resolve a file name to decoded UTF-8 text. The core never
/// touches the filesystem or a browser file picker itself.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Read the full text content for `name`
    async fn read_to_string(&self, name: &str) -> Result<String>;
}

/// Persistence callback for batch submission
///
/// An `Err` marks the batch as failed for this attempt; the dispatcher owns
/// the retry policy.
#[async_trait]
pub trait BatchSubmitter: Send + Sync {
    async fn submit(&self, batch: &BatchInfo) -> Result<()>;
}

/// Cumulative progress after a batch completes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub completed_batches: usize,
    pub total_batches: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
    pub processed_movements: usize,
    pub elapsed_ms: u64,
    pub estimated_remaining_ms: u64,
}

/// Cumulative progress after a file completes parsing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileProgress {
    pub completed_files: usize,
    pub total_files: usize,
    pub file_name: String,
    pub rows: usize,
    pub success: bool,
    pub elapsed_ms: u64,
}

/// Advisory progress observer - no backpressure effect
///
/// Both hooks default to no-ops so implementations pick what they care about.
pub trait ProgressObserver: Send + Sync {
    fn on_batch_completed(&self, _progress: &BatchProgress) {}
    fn on_file_completed(&self, _progress: &FileProgress) {}
}
