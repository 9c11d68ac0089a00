//! Line tokenizer for the non-standard CSV dialect
//!
//! The source files split on commas, but a category value may itself contain
//! unescaped commas (`Comida: Super, Kiosco`). The smart variant reconciles
//! the observed comma count against the expected column count and reassigns
//! the excess commas to a configured or heuristically detected column, so
//! these lines still tokenize to the right arity.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ColumnCommasConfig;
use crate::diagnostics::OverflowResolution;

static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid numeric pattern"));

/// Default token classifier: does this token look like a plain number?
///
/// Deliberately strict (`-?\d+(\.\d+)?` only): thousands separators or
/// currency symbols make a token "text" and therefore absorbable. Swap the
/// classifier on [`Tokenizer`] for locale-aware behavior.
pub fn is_numeric_token(token: &str) -> bool {
    NUMERIC_RE.is_match(token.trim())
}

/// Separator used when re-joining absorbed tokens into one field
const REJOIN_SEPARATOR: &str = ", ";

/// Tokenizer for one raw CSV line
///
/// Splits on `,` outside double-quoted spans; a backslash escapes the
/// following character, including inside quotes; quote characters toggle
/// quoting and are not emitted; every field is trimmed. Malformed quoting is
/// never an error - splitting degrades to best effort.
#[derive(Clone, Copy)]
pub struct Tokenizer {
    classifier: fn(&str) -> bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            classifier: is_numeric_token,
        }
    }

    /// Use an alternate "looks like a number" classifier
    pub fn with_classifier(classifier: fn(&str) -> bool) -> Self {
        Self { classifier }
    }

    /// Whether `token` classifies as numeric under this tokenizer's classifier
    pub fn classifies_numeric(&self, token: &str) -> bool {
        (self.classifier)(token)
    }

    /// Plain tokenization: quotes, escapes, trim. Never fails.
    pub fn tokenize(&self, line: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut escaped = false;

        for c in line.chars() {
            if escaped {
                current.push(c);
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '"' => in_quotes = !in_quotes,
                ',' if !in_quotes => {
                    tokens.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(c),
            }
        }
        tokens.push(current.trim().to_string());
        tokens
    }

    /// Tokenize reconciling comma count against `expected_columns`
    pub fn tokenize_smart(
        &self,
        line: &str,
        expected_columns: usize,
        commas_config: Option<&ColumnCommasConfig>,
    ) -> Vec<String> {
        self.tokenize_smart_with_resolution(line, expected_columns, commas_config)
            .0
    }

    /// Like [`tokenize_smart`](Self::tokenize_smart), also reporting which
    /// strategy resolved the overflow
    pub fn tokenize_smart_with_resolution(
        &self,
        line: &str,
        expected_columns: usize,
        commas_config: Option<&ColumnCommasConfig>,
    ) -> (Vec<String>, OverflowResolution) {
        if expected_columns == 0 {
            return (self.tokenize(line), OverflowResolution::None);
        }

        let total_commas = line.matches(',').count();
        let needed_commas = expected_columns - 1;

        // Exact match is unambiguous; undershoot gets no correction - the
        // parser rejects short rows later.
        if total_commas <= needed_commas {
            return (self.tokenize(line), OverflowResolution::None);
        }

        let extra = total_commas - needed_commas;
        let tokens = self.tokenize(line);

        // Quoting may already have absorbed the excess commas.
        if tokens.len() <= expected_columns {
            return (tokens, OverflowResolution::None);
        }

        let target = match commas_config {
            Some(config) => match config.target_column(tokens.len()) {
                // Configured budget exceeded: the config says this line cannot
                // be explained by that column, so fall back to correction.
                Some((_, max)) if extra > max => None,
                Some((index, _)) => Some((index, OverflowResolution::Configured { column: index })),
                None => self.separator_heuristic_target(&tokens),
            },
            None => self.separator_heuristic_target(&tokens),
        };

        match target {
            Some((index, resolution)) => (self.absorb(tokens, index, extra), resolution),
            None => (
                self.tokenize_with_correction(line, expected_columns),
                OverflowResolution::Correction,
            ),
        }
    }

    /// Fallback correction: treat everything before the first numeric token as
    /// one joined free-text field, keep the rest as-is
    pub fn tokenize_with_correction(&self, line: &str, expected_columns: usize) -> Vec<String> {
        let tokens = self.tokenize(line);
        if tokens.len() <= expected_columns {
            return tokens;
        }

        match tokens.iter().position(|t| (self.classifier)(t)) {
            Some(numeric_index) if numeric_index > 0 => {
                let mut corrected = vec![tokens[..numeric_index].join(REJOIN_SEPARATOR)];
                corrected.extend_from_slice(&tokens[numeric_index..]);
                corrected
            }
            _ => tokens,
        }
    }

    /// First token containing the category separator `:`
    fn separator_heuristic_target(
        &self,
        tokens: &[String],
    ) -> Option<(usize, OverflowResolution)> {
        tokens
            .iter()
            .position(|t| t.contains(':'))
            .map(|index| (index, OverflowResolution::Heuristic { column: index }))
    }

    /// Greedily absorb up to `extra` tokens after `target` into one field,
    /// never absorbing past a numeric token
    fn absorb(&self, tokens: Vec<String>, target: usize, extra: usize) -> Vec<String> {
        let mut merged = tokens[target].clone();
        let mut next = target + 1;
        let mut absorbed = 0;

        while absorbed < extra && next < tokens.len() {
            if (self.classifier)(&tokens[next]) {
                break;
            }
            merged.push_str(REJOIN_SEPARATOR);
            merged.push_str(&tokens[next]);
            next += 1;
            absorbed += 1;
        }

        let mut result = Vec::with_capacity(tokens.len() - absorbed);
        result.extend_from_slice(&tokens[..target]);
        result.push(merged);
        result.extend_from_slice(&tokens[next..]);
        result
    }
}
