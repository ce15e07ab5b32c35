//! Query descriptor and result shapes.
//!
//! # Responsibility
//! - Define filter conditions, sort keys and page requests as plain data.
//! - Define `Page` (counted) and `Slice` (has-more) result containers.

use crate::query::{QueryError, QueryResult};

/// Typed value a condition compares against or a field resolves to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Comparison operator applied by a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    /// Equality ignoring ASCII case on text fields; exact on everything else.
    EqualsIgnoreCase,
    /// SQL LIKE semantics: `%` any run, `_` one character, anchored,
    /// case-sensitive.
    Like,
}

/// One field-path comparison, e.g. `category.name equals "GADGET MURAH"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: FieldValue,
}

impl Condition {
    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            operator: Operator::Equals,
            value: value.into(),
        }
    }

    pub fn equals_ignore_case(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            operator: Operator::EqualsIgnoreCase,
            value: value.into(),
        }
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: Operator::Like,
            value: FieldValue::Text(pattern.into()),
        }
    }
}

/// Matching options for query-by-example probes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExampleMatcher {
    pub ignore_case: bool,
}

impl ExampleMatcher {
    /// Exact equality on every populated probe field.
    pub fn exact() -> Self {
        Self::default()
    }

    /// Case-insensitive equality on text fields.
    pub fn ignoring_case() -> Self {
        Self { ignore_case: true }
    }
}

/// Conjunctive or disjunctive group of conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Filter {
    /// Single equality condition, the most common derived-query shape.
    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::All(vec![Condition::equals(field, value)])
    }

    /// Single LIKE condition.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::All(vec![Condition::like(field, pattern)])
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::All(conditions)
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::Any(conditions)
    }
}

/// Per-key sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One sort key; multi-key sorts apply keys left to right, stably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

/// Zero-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub(crate) fn validate(&self) -> QueryResult<()> {
        if self.size == 0 {
            return Err(QueryError::InvalidPageSize { size: self.size });
        }
        Ok(())
    }
}

/// Counted page result: reports the total across all pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    /// `ceil(total_elements / size)`.
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Maps page content to another shape, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

/// Uncounted page result: reports only whether a further page exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub has_next: bool,
}

impl<T> Slice<T> {
    /// Request for the following page, when one exists.
    pub fn next_page(&self) -> Option<PageRequest> {
        self.has_next
            .then(|| PageRequest::new(self.page + 1, self.size))
    }

    /// Maps slice content to another shape, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Slice<U> {
        Slice {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            has_next: self.has_next,
        }
    }
}
