//! Derived-query dispatch over record snapshots.
//!
//! # Responsibility
//! - Define the structured query descriptor (field path, operator, value,
//!   sort, page) that replaces method-name-derived queries.
//! - Evaluate descriptors against in-memory record snapshots.
//!
//! # Invariants
//! - Unknown field paths fail loudly instead of matching nothing.
//! - A page request beyond the available data yields an empty result, never
//!   an error.

pub mod descriptor;
pub mod eval;
mod like;

pub use descriptor::{
    Condition, Direction, ExampleMatcher, FieldValue, Filter, Operator, Page, PageRequest, Slice,
    SortKey,
};
pub use eval::{count, exists, select, select_page, select_slice, Record};

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for query dispatch.
pub type QueryResult<T> = Result<T, QueryError>;

/// Query-layer error for descriptor validation and evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Field path does not exist on the queried record shape.
    UnknownField { field: String },
    /// Operator applied to a field or value of the wrong type.
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
    /// Page size of zero cannot produce a page.
    InvalidPageSize { size: u32 },
    /// LIKE pattern could not be compiled.
    InvalidPattern { pattern: String, message: String },
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { field } => write!(f, "unknown field path `{field}`"),
            Self::TypeMismatch { field, expected } => {
                write!(f, "field `{field}` requires {expected}")
            }
            Self::InvalidPageSize { size } => write!(f, "invalid page size {size}"),
            Self::InvalidPattern { pattern, message } => {
                write!(f, "invalid LIKE pattern `{pattern}`: {message}")
            }
        }
    }
}

impl Error for QueryError {}
