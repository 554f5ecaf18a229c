//! Query pattern normalization.
//!
//! Strips literals out of a SQL statement so that structurally identical
//! queries group together regardless of parameter values:
//! quoted strings become `'?'`, standalone digit runs become `?`, and
//! whitespace is collapsed. The result is truncated to bound storage and
//! comparison cost.

use regex::Regex;
use std::sync::LazyLock;

/// Single-quoted SQL literals, including embedded `''` escapes.
static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(?:[^']|'')*'").expect("literal pattern"));

/// Standalone runs of digits (not part of an identifier like `col1`).
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\b").expect("number pattern"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("ws pattern"));

/// Normalizes a raw statement into its pattern.
///
/// Pure and deterministic; never fails, even on malformed SQL (an
/// unterminated literal is simply left as-is). Idempotent:
/// `normalize(normalize(s), n) == normalize(s, n)`.
pub fn normalize(raw: &str, max_len: usize) -> String {
    let pattern = STRING_LITERAL.replace_all(raw, "'?'");
    let pattern = NUMBER.replace_all(&pattern, "?");
    let pattern = WHITESPACE.replace_all(&pattern, " ");
    truncate_chars(pattern.trim(), max_len)
}

/// Truncates to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}
