//! Splitting of multi-clause "parking held" descriptions.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapses every run of whitespace into a single space.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").into_owned()
}

/// Splits a description into trimmed, comma-separated clauses.
///
/// Whitespace is normalized first. Empty clauses (e.g. from a trailing
/// comma) are kept so that the clause count reflects the raw text.
#[must_use]
pub fn split_clauses(description: &str) -> Vec<String> {
    normalize_whitespace(description)
        .split(',')
        .map(|clause| clause.trim().to_string())
        .collect()
}
