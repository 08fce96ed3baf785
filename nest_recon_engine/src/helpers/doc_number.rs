//! Document-number formatting and parsing.
//!
//! Numbers are rendered as `{PREFIX}-{year}-{counter}` with the counter zero-padded to
//! [`DOC_NUMBER_PAD_WIDTH`] digits, e.g. `INV-2026-0042`. Formatting is a pure function of the
//! tuple; parsing is its inverse and is what counter seeding uses to recover the highest number
//! already consumed by pre-existing documents.

use regex::Regex;

use crate::db_types::DocumentNumber;

/// Counters are padded to this width. Counters beyond it simply grow wider; sort order in
/// reports is cosmetic, uniqueness is what matters.
pub const DOC_NUMBER_PAD_WIDTH: usize = 4;

/// Render a document number from its parts. Pure; no side effects and no storage access.
pub fn format_document_number(prefix: &str, year: i32, counter: i64) -> DocumentNumber {
    DocumentNumber(format!("{prefix}-{year}-{counter:0width$}", width = DOC_NUMBER_PAD_WIDTH))
}

/// Split a document number back into `(prefix, year, counter)`. Returns `None` for strings that
/// were not produced by [`format_document_number`].
pub fn parse_document_number(value: &str) -> Option<(String, i32, i64)> {
    let pattern = Regex::new(r"^([A-Za-z0-9]+)-(\d{4})-(\d+)$").unwrap();
    let captures = pattern.captures(value)?;
    let prefix = captures.get(1)?.as_str().to_string();
    let year = captures.get(2)?.as_str().parse::<i32>().ok()?;
    let counter = captures.get(3)?.as_str().parse::<i64>().ok()?;
    Some((prefix, year, counter))
}
