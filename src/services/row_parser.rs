//! Positional row parser
//!
//! Consumes tokenized lines plus header detection to build [`CsvRow`]
//! records. Without declared column definitions it falls back to the fixed
//! eleven-column layout the dashboard exports
//! (`Identificador, Fecha, Estado, Tipo, Cuenta, Beneficiario, Categoria,
//! Importe, Divisa, Numero, Notas`), locating the amount by classifier scan
//! and assembling the free-text fields from the surrounding token span.

use serde::Serialize;

use crate::config::{ColumnCommasConfig, ColumnDefinition};
use crate::diagnostics::{OverflowResolution, TraceEvent};
use crate::domain::CsvRow;
use crate::services::normalizer::parse_signed_amount;
use crate::services::tokenizer::Tokenizer;

/// Keywords that mark the first line as a header (case-insensitive substring)
const HEADER_KEYWORDS: &[&str] = &[
    "identificador",
    "fecha",
    "estado",
    "tipo",
    "cuenta",
    "beneficiario",
    "categoria",
    "categoría",
    "importe",
    "divisa",
    "numero",
    "número",
    "notas",
];

/// Minimum token count for a line to become a row
const MIN_TOKENS: usize = 8;

/// Fixed slot of the amount column in the positional layout
const POSITIONAL_AMOUNT: usize = 7;

/// Fixed slot of the payee column in the positional layout
const POSITIONAL_PAYEE: usize = 5;

/// Result of parsing one file's content
#[derive(Debug, Default, Serialize)]
pub struct ParseOutcome {
    pub rows: Vec<CsvRow>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metadata: ParseMetadata,
    /// Typed diagnostics; replaces ad hoc logging inside the parser
    pub trace: Vec<TraceEvent>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMetadata {
    pub total_lines: usize,
    pub data_lines: usize,
    pub skipped_lines: usize,
    pub header_detected: bool,
    pub expected_columns: usize,
    pub headers: Vec<String>,
}

/// Where each logical field sits in a tokenized line
///
/// `None` means the field has no fixed slot and is resolved relative to the
/// located amount column (or assembled from a token span).
#[derive(Debug, Default, Clone)]
struct ColumnLayout {
    id: Option<usize>,
    date: Option<usize>,
    status: Option<usize>,
    kind: Option<usize>,
    account: Option<usize>,
    payee: Option<usize>,
    category: Option<usize>,
    amount: Option<usize>,
    currency: Option<usize>,
    reference: Option<usize>,
    notes: Option<usize>,
}

impl ColumnLayout {
    /// The fixed dashboard-export layout. Only the leading six columns get
    /// hard slots; amount is located by scan and everything after it is
    /// resolved relative to the amount, so merged-category lines whose token
    /// positions shifted still parse.
    fn positional() -> Self {
        Self {
            id: Some(0),
            date: Some(1),
            status: Some(2),
            kind: Some(3),
            account: Some(4),
            payee: Some(POSITIONAL_PAYEE),
            ..Default::default()
        }
    }

    fn from_definitions(definitions: &[ColumnDefinition], headers: &[String]) -> Self {
        let mut layout = Self::default();
        for definition in definitions {
            let index = resolve_column_index(&definition.name, definition.order, headers);
            let name = definition.name.to_lowercase();
            if name.contains("identificador") {
                layout.id = Some(index);
            } else if name.contains("fecha") {
                layout.date = Some(index);
            } else if name.contains("estado") {
                layout.status = Some(index);
            } else if name.contains("tipo") {
                layout.kind = Some(index);
            } else if name.contains("cuenta") {
                layout.account = Some(index);
            } else if name.contains("beneficiario") {
                layout.payee = Some(index);
            } else if name.contains("categor") {
                layout.category = Some(index);
            } else if name.contains("importe") {
                layout.amount = Some(index);
            } else if name.contains("divisa") {
                layout.currency = Some(index);
            } else if name.contains("numero") || name.contains("número") {
                layout.reference = Some(index);
            } else if name.contains("nota") {
                layout.notes = Some(index);
            }
        }
        layout
    }
}

/// Resolve a declared column name to an index: header text first, declared
/// 1-based order as fallback
fn resolve_column_index(name: &str, order: usize, headers: &[String]) -> usize {
    let lowered = name.to_lowercase();
    headers
        .iter()
        .position(|h| h.to_lowercase().contains(&lowered))
        .unwrap_or_else(|| order.saturating_sub(1))
}

/// Non-empty lines of `content`, 1-based, CRLF normalized
pub(crate) fn content_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, l))
        .collect()
}

/// Positional row parser
pub struct RowParser {
    tokenizer: Tokenizer,
}

impl Default for RowParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RowParser {
    pub fn new() -> Self {
        Self {
            tokenizer: Tokenizer::new(),
        }
    }

    pub fn with_tokenizer(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// Parse one file's content into rows
    ///
    /// Per-line problems are collected as warnings and the line is skipped;
    /// the only error this reports is ending up with zero rows.
    pub fn parse_content(
        &self,
        content: &str,
        column_definitions: Option<&[ColumnDefinition]>,
    ) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let lines = content_lines(content);
        outcome.metadata.total_lines = lines.len();

        if lines.is_empty() {
            outcome.errors.push("input contains no data".to_string());
            return outcome;
        }

        let first_tokens = self.tokenizer.tokenize(lines[0].1);
        let header_detected = first_tokens.iter().any(|token| {
            let lowered = token.to_lowercase();
            HEADER_KEYWORDS.iter().any(|k| lowered.contains(k))
        });

        let (headers, data_lines) = if header_detected {
            (first_tokens, &lines[1..])
        } else {
            (Vec::new(), &lines[..])
        };

        let expected_columns = if header_detected {
            headers.len()
        } else {
            self.tokenizer.tokenize(lines[0].1).len()
        };

        outcome.metadata.header_detected = header_detected;
        outcome.metadata.expected_columns = expected_columns;
        outcome.metadata.headers = headers.clone();
        outcome.metadata.data_lines = data_lines.len();
        outcome.trace.push(if header_detected {
            TraceEvent::HeaderDetected {
                columns: expected_columns,
            }
        } else {
            TraceEvent::HeaderAssumed {
                columns: expected_columns,
            }
        });

        let commas_config = column_definitions
            .map(|defs| derive_commas_config(defs, &headers))
            .filter(|config| !config.is_empty());

        let layout = match column_definitions {
            Some(defs) if !defs.is_empty() => ColumnLayout::from_definitions(defs, &headers),
            _ => ColumnLayout::positional(),
        };

        for (line_number, line) in data_lines {
            let (tokens, resolution) = self.tokenizer.tokenize_smart_with_resolution(
                line,
                expected_columns,
                commas_config.as_ref(),
            );

            if resolution != OverflowResolution::None {
                let extra = line
                    .matches(',')
                    .count()
                    .saturating_sub(expected_columns.saturating_sub(1));
                outcome.trace.push(TraceEvent::CommaOverflow {
                    line: *line_number,
                    extra,
                    resolution,
                });
            }

            if tokens.len() < MIN_TOKENS {
                outcome.warnings.push(format!(
                    "line {}: expected at least {} fields, got {} - skipped",
                    line_number,
                    MIN_TOKENS,
                    tokens.len()
                ));
                outcome.trace.push(TraceEvent::RowSkipped {
                    line: *line_number,
                    reason: format!("{} fields", tokens.len()),
                });
                outcome.metadata.skipped_lines += 1;
                continue;
            }

            outcome.rows.push(self.build_row(&tokens, &layout));
        }

        if outcome.rows.is_empty() {
            outcome
                .errors
                .push("no valid rows could be parsed from the input".to_string());
        }

        outcome
    }

    fn build_row(&self, tokens: &[String], layout: &ColumnLayout) -> CsvRow {
        let field = |slot: Option<usize>| -> String {
            slot.and_then(|i| tokens.get(i)).cloned().unwrap_or_default()
        };

        let amount_index = layout
            .amount
            .filter(|i| *i < tokens.len())
            .or_else(|| self.locate_amount(tokens));
        let amount = amount_index
            .and_then(|i| tokens.get(i))
            .map(|t| parse_signed_amount(t))
            .unwrap_or_default();

        let category = match layout.category {
            Some(slot) => field(Some(slot)),
            None => {
                // everything between the payee and the located amount
                let start = layout.payee.map(|p| p + 1).unwrap_or(POSITIONAL_PAYEE + 1);
                match amount_index {
                    Some(end) if end > start => join_span(&tokens[start..end]),
                    _ => String::new(),
                }
            }
        };

        let currency = match layout.currency {
            Some(slot) => field(Some(slot)),
            None => amount_index
                .and_then(|a| tokens.get(a + 1))
                .cloned()
                .unwrap_or_default(),
        };

        let reference = match layout.reference {
            Some(slot) => field(Some(slot)),
            None => amount_index
                .and_then(|a| tokens.get(a + 2))
                .cloned()
                .unwrap_or_default(),
        };

        let notes = match layout.notes {
            Some(slot) => field(Some(slot)),
            None => locate_notes(tokens, amount_index),
        };

        CsvRow {
            id: field(layout.id),
            date: field(layout.date),
            status: field(layout.status),
            kind: field(layout.kind),
            account: field(layout.account),
            payee: field(layout.payee),
            category,
            amount,
            currency,
            reference,
            notes,
        }
    }

    /// Locate the amount column: the fixed slot when it parses as a number,
    /// otherwise the first numeric token after the payee, otherwise the first
    /// numeric token past the identifier. Index 0 is never a candidate: that
    /// is the identifier slot, and purely numeric identifiers would otherwise
    /// shadow the real amount on every row.
    fn locate_amount(&self, tokens: &[String]) -> Option<usize> {
        if tokens
            .get(POSITIONAL_AMOUNT)
            .is_some_and(|t| self.tokenizer.classifies_numeric(t))
        {
            return Some(POSITIONAL_AMOUNT);
        }

        let numeric_at = |from: usize| {
            tokens
                .iter()
                .enumerate()
                .skip(from)
                .find(|(_, t)| self.tokenizer.classifies_numeric(t))
                .map(|(i, _)| i)
        };

        numeric_at(POSITIONAL_PAYEE + 1).or_else(|| numeric_at(1))
    }
}

/// Join a token span, dropping empty members
fn join_span(tokens: &[String]) -> String {
    tokens
        .iter()
        .filter(|t| !t.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Notes fallback chain: tokens after the reference slot, then after the
/// currency, then after the amount, then any long token containing a space
fn locate_notes(tokens: &[String], amount_index: Option<usize>) -> String {
    if let Some(amount) = amount_index {
        for start in [amount + 3, amount + 2, amount + 1] {
            if start < tokens.len() {
                let joined = join_span(&tokens[start..]);
                if !joined.is_empty() {
                    return joined;
                }
            }
        }
    }

    tokens
        .iter()
        .find(|t| t.len() > 10 && t.contains(' '))
        .cloned()
        .unwrap_or_default()
}

/// Commas config from declared definitions, resolved against the header
fn derive_commas_config(
    definitions: &[ColumnDefinition],
    headers: &[String],
) -> ColumnCommasConfig {
    let mut config = ColumnCommasConfig::new();
    for definition in definitions {
        if let Some(max) = definition.max_commas.filter(|m| *m > 0) {
            let index = resolve_column_index(&definition.name, definition.order, headers);
            config = config.allow(index, max);
        }
    }
    config
}
