//! SQL LIKE pattern translation.
//!
//! # Invariants
//! - Patterns are anchored at both ends and case-sensitive.
//! - Everything except `%` and `_` matches literally.

use crate::query::{QueryError, QueryResult};
use regex::Regex;

/// Compiles a SQL LIKE pattern (`%` any run, `_` one character) to an
/// anchored regex.
pub(crate) fn compile_like(pattern: &str) -> QueryResult<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 2);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    expr.push('$');

    Regex::new(&expr).map_err(|err| QueryError::InvalidPattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}
