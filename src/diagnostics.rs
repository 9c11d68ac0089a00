//! Typed diagnostics emitted by the parsers
//!
//! The tokenizer and parsers never log; they describe what happened as a list
//! of events returned alongside the parse result. Callers who want visibility
//! inspect (or serialize) the list; tests assert on it without capturing any
//! log output.

use serde::{Deserialize, Serialize};

/// How an excess-comma line was resolved by the smart tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "camelCase")]
pub enum OverflowResolution {
    /// Merged into the column named by the commas config
    Configured { column: usize },
    /// Merged into the first token containing the category separator
    Heuristic { column: usize },
    /// Fell back to joining everything before the first numeric token
    Correction,
    /// Comma count already matched (or undershot) - nothing to resolve
    None,
}

/// One trace event from a parse run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TraceEvent {
    /// The first line matched the header keyword set
    HeaderDetected { columns: usize },
    /// No header line; the first data line fixed the column count
    HeaderAssumed { columns: usize },
    /// A line carried more commas than the schema allows
    CommaOverflow {
        line: usize,
        extra: usize,
        resolution: OverflowResolution,
    },
    /// A line was skipped without producing a row
    RowSkipped { line: usize, reason: String },
    /// A mapping failed validation before any parsing was attempted
    MappingRejected { errors: usize },
}
