//! Mapping-driven row parser
//!
//! Alternate row-construction path driven by an explicit field -> header-text
//! mapping. The mapping is validated against the file's header before any
//! parsing happens; validation failure short-circuits with zero rows and one
//! error per violation.

use rust_decimal::Decimal;

use crate::config::MappingConfig;
use crate::diagnostics::TraceEvent;
use crate::domain::CsvRow;
use crate::services::normalizer::parse_signed_amount;
use crate::services::row_parser::{content_lines, ParseOutcome};
use crate::services::tokenizer::Tokenizer;

/// Minimum token count for a mapped line to become a row
const MIN_TOKENS: usize = 3;

/// Header-index view of a validated mapping
#[derive(Debug, Default)]
struct ResolvedMapping {
    date: Option<usize>,
    category: Option<usize>,
    amount: Option<usize>,
    outflow: Option<usize>,
    inflow: Option<usize>,
    currency: Option<usize>,
    reference: Option<usize>,
    note: Option<usize>,
    id: Option<usize>,
}

impl ResolvedMapping {
    fn resolve(mapping: &MappingConfig, headers: &[String]) -> Self {
        let index_of = |mapped: Option<&str>| {
            mapped.and_then(|name| {
                headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
            })
        };

        Self {
            date: index_of(Some(mapping.date.as_str())),
            category: index_of(Some(mapping.category.as_str())),
            amount: index_of(mapping.amount.as_deref()),
            outflow: index_of(mapping.outflow.as_deref()),
            inflow: index_of(mapping.inflow.as_deref()),
            currency: index_of(mapping.currency.as_deref()),
            reference: index_of(mapping.reference.as_deref()),
            note: index_of(mapping.note.as_deref()),
            id: index_of(mapping.id.as_deref()),
        }
    }
}

/// Mapping-driven parser
pub struct MappingParser {
    tokenizer: Tokenizer,
}

impl Default for MappingParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingParser {
    pub fn new() -> Self {
        Self {
            tokenizer: Tokenizer::new(),
        }
    }

    pub fn with_tokenizer(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// Parse content resolving every logical field through `mapping`
    pub fn parse_content_with_mapping(
        &self,
        content: &str,
        mapping: &MappingConfig,
    ) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let lines = content_lines(content);
        outcome.metadata.total_lines = lines.len();

        if lines.is_empty() {
            outcome.errors.push("input contains no data".to_string());
            return outcome;
        }

        let headers = self.tokenizer.tokenize(lines[0].1);
        let validation_errors = mapping.validate(&headers);
        if !validation_errors.is_empty() {
            outcome.trace.push(TraceEvent::MappingRejected {
                errors: validation_errors.len(),
            });
            outcome.errors = validation_errors;
            return outcome;
        }

        let expected_columns = headers.len();
        outcome.metadata.header_detected = true;
        outcome.metadata.expected_columns = expected_columns;
        outcome.metadata.headers = headers.clone();
        outcome.trace.push(TraceEvent::HeaderDetected {
            columns: expected_columns,
        });

        let resolved = ResolvedMapping::resolve(mapping, &headers);
        let data_lines = &lines[1..];
        outcome.metadata.data_lines = data_lines.len();

        for (line_number, line) in data_lines {
            let tokens = self
                .tokenizer
                .tokenize_smart(line, expected_columns, None);

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

            outcome.rows.push(build_row(&tokens, &resolved));
        }

        if outcome.rows.is_empty() {
            outcome
                .errors
                .push("no valid rows could be parsed from the input".to_string());
        }

        outcome
    }
}

fn build_row(tokens: &[String], resolved: &ResolvedMapping) -> CsvRow {
    let field = |slot: Option<usize>| -> String {
        slot.and_then(|i| tokens.get(i)).cloned().unwrap_or_default()
    };

    let (amount, kind) = resolve_amount(tokens, resolved);

    CsvRow {
        id: field(resolved.id),
        date: field(resolved.date),
        status: String::new(),
        kind,
        account: String::new(),
        payee: String::new(),
        category: field(resolved.category),
        amount,
        currency: field(resolved.currency),
        reference: field(resolved.reference),
        notes: field(resolved.note),
    }
}

/// Amount and direction from the mapped columns
///
/// A single `importe` column keeps its sign and leaves direction to the
/// normalizer. With separate `egreso`/`ingreso` columns both carrying a
/// non-zero value, the larger magnitude wins; equal magnitudes resolve to
/// `ingreso`. This leniency matches the input files the dashboard receives
/// and is deliberate policy, not an error.
fn resolve_amount(tokens: &[String], resolved: &ResolvedMapping) -> (Decimal, String) {
    if let Some(index) = resolved.amount {
        let signed = tokens
            .get(index)
            .map(|t| parse_signed_amount(t))
            .unwrap_or_default();
        return (signed, String::new());
    }

    let magnitude_at = |slot: Option<usize>| {
        slot.and_then(|i| tokens.get(i))
            .map(|t| parse_signed_amount(t).abs())
            .unwrap_or_default()
    };

    let outflow = magnitude_at(resolved.outflow);
    let inflow = magnitude_at(resolved.inflow);

    if outflow > inflow {
        (-outflow, "egreso".to_string())
    } else {
        (inflow, "ingreso".to_string())
    }
}

/// Suggest a mapping from header keywords
///
/// Best-guess only: unmatched required fields come back as empty strings and
/// fail validation, which is how callers learn the suggestion is incomplete.
pub fn suggest_mapping(headers: &[String]) -> MappingConfig {
    let date_patterns = ["fecha", "date"];
    let category_patterns = ["categoria", "categoría", "rubro", "category"];
    let amount_patterns = ["importe", "monto", "amount"];
    let outflow_patterns = ["egreso", "debito", "débito", "gasto", "debit"];
    let inflow_patterns = ["ingreso", "credito", "crédito", "credit", "deposito"];
    let currency_patterns = ["divisa", "moneda", "currency"];
    let reference_patterns = ["numero", "número", "referencia", "nro"];
    let note_patterns = ["nota", "descripcion", "descripción", "detalle", "memo"];
    let id_patterns = ["identificador", "id"];

    let find = |patterns: &[&str]| {
        headers
            .iter()
            .find(|header| {
                let lowered = header.to_lowercase();
                patterns.iter().any(|p| lowered.contains(p))
            })
            .cloned()
    };

    MappingConfig {
        date: find(&date_patterns).unwrap_or_default(),
        category: find(&category_patterns).unwrap_or_default(),
        amount: find(&amount_patterns),
        outflow: find(&outflow_patterns),
        inflow: find(&inflow_patterns),
        currency: find(&currency_patterns),
        reference: find(&reference_patterns),
        note: find(&note_patterns),
        id: find(&id_patterns),
    }
}
