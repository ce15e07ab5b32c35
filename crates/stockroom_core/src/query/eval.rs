//! Descriptor evaluation over record snapshots.
//!
//! # Responsibility
//! - Filter, sort and paginate records according to a query descriptor.
//! - Resolve string field paths through the `Record` trait, including
//!   relation traversal paths like `category.name` on joined views.
//!
//! # Invariants
//! - Sorting is stable; equal keys keep snapshot order.
//! - Filtering never mutates; callers decide what to do with matches.

use crate::query::descriptor::{
    Condition, Direction, FieldValue, Filter, Operator, Page, PageRequest, Slice, SortKey,
};
use crate::query::like::compile_like;
use crate::query::{QueryError, QueryResult};
use regex::Regex;
use std::cmp::Ordering;

/// Field-path access for queryable record shapes.
///
/// Returning `None` means the path does not exist on this shape; evaluation
/// turns that into [`QueryError::UnknownField`].
pub trait Record {
    fn field(&self, path: &str) -> Option<FieldValue>;
}

/// One condition prepared for a scan; LIKE patterns are compiled here, once
/// per query instead of once per record.
enum Prepared<'f> {
    Equals(&'f str, &'f FieldValue),
    EqualsIgnoreCase(&'f str, &'f FieldValue),
    Like(&'f str, Regex),
}

enum PreparedFilter<'f> {
    All(Vec<Prepared<'f>>),
    Any(Vec<Prepared<'f>>),
}

fn prepare_condition(condition: &Condition) -> QueryResult<Prepared<'_>> {
    match condition.operator {
        Operator::Equals => Ok(Prepared::Equals(&condition.field, &condition.value)),
        Operator::EqualsIgnoreCase => {
            Ok(Prepared::EqualsIgnoreCase(&condition.field, &condition.value))
        }
        Operator::Like => {
            let FieldValue::Text(pattern) = &condition.value else {
                return Err(QueryError::TypeMismatch {
                    field: condition.field.clone(),
                    expected: "a text pattern for LIKE",
                });
            };
            Ok(Prepared::Like(&condition.field, compile_like(pattern)?))
        }
    }
}

fn prepare_conditions(conditions: &[Condition]) -> QueryResult<Vec<Prepared<'_>>> {
    conditions.iter().map(prepare_condition).collect()
}

fn prepare_filter(filter: &Filter) -> QueryResult<PreparedFilter<'_>> {
    match filter {
        Filter::All(conditions) => Ok(PreparedFilter::All(prepare_conditions(conditions)?)),
        Filter::Any(conditions) => Ok(PreparedFilter::Any(prepare_conditions(conditions)?)),
    }
}

fn condition_matches<T: Record>(record: &T, condition: &Prepared<'_>) -> QueryResult<bool> {
    let field = match condition {
        Prepared::Equals(field, _)
        | Prepared::EqualsIgnoreCase(field, _)
        | Prepared::Like(field, _) => *field,
    };
    let Some(actual) = record.field(field) else {
        return Err(QueryError::UnknownField {
            field: field.to_string(),
        });
    };

    match condition {
        Prepared::Equals(_, value) => Ok(actual == **value),
        Prepared::EqualsIgnoreCase(_, value) => match (&actual, value) {
            (FieldValue::Text(left), FieldValue::Text(right)) => {
                Ok(left.eq_ignore_ascii_case(right))
            }
            _ => Ok(actual == **value),
        },
        Prepared::Like(_, regex) => {
            let FieldValue::Text(text) = actual else {
                return Err(QueryError::TypeMismatch {
                    field: field.to_string(),
                    expected: "a text field for LIKE",
                });
            };
            Ok(regex.is_match(&text))
        }
    }
}

fn filter_matches<T: Record>(record: &T, filter: &PreparedFilter<'_>) -> QueryResult<bool> {
    match filter {
        PreparedFilter::All(conditions) => {
            for condition in conditions {
                if !condition_matches(record, condition)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        PreparedFilter::Any(conditions) => {
            for condition in conditions {
                if condition_matches(record, condition)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn sort_records<T: Record>(records: &mut [T], keys: &[SortKey]) -> QueryResult<()> {
    if keys.is_empty() || records.is_empty() {
        return Ok(());
    }

    // Validate paths up front so an unknown sort field fails loudly instead
    // of silently comparing equal inside the sort closure.
    if let Some(first) = records.first() {
        for key in keys {
            if first.field(&key.field).is_none() {
                return Err(QueryError::UnknownField {
                    field: key.field.clone(),
                });
            }
        }
    }

    records.sort_by(|a, b| {
        for key in keys {
            let left = a.field(&key.field);
            let right = b.field(&key.field);
            let ordering = match (left, right) {
                (Some(left), Some(right)) => left.cmp(&right),
                _ => Ordering::Equal,
            };
            let ordering = match key.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    Ok(())
}

/// Filters and sorts a snapshot, returning all matches.
pub fn select<T: Record + Clone>(
    records: &[T],
    filter: Option<&Filter>,
    sort: &[SortKey],
) -> QueryResult<Vec<T>> {
    let prepared = filter.map(prepare_filter).transpose()?;
    let mut matched = Vec::new();
    for record in records {
        let keep = match &prepared {
            Some(filter) => filter_matches(record, filter)?,
            None => true,
        };
        if keep {
            matched.push(record.clone());
        }
    }
    sort_records(&mut matched, sort)?;
    Ok(matched)
}

/// Counts matching records.
pub fn count<T: Record>(records: &[T], filter: Option<&Filter>) -> QueryResult<u64> {
    let prepared = filter.map(prepare_filter).transpose()?;
    let mut total = 0;
    for record in records {
        let keep = match &prepared {
            Some(filter) => filter_matches(record, filter)?,
            None => true,
        };
        if keep {
            total += 1;
        }
    }
    Ok(total)
}

/// Returns whether at least one record matches, short-circuiting.
pub fn exists<T: Record>(records: &[T], filter: Option<&Filter>) -> QueryResult<bool> {
    let prepared = filter.map(prepare_filter).transpose()?;
    for record in records {
        let keep = match &prepared {
            Some(filter) => filter_matches(record, filter)?,
            None => true,
        };
        if keep {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Filters, sorts and pages a snapshot, reporting totals.
///
/// A page beyond the available data returns empty content with the totals
/// intact.
pub fn select_page<T: Record + Clone>(
    records: &[T],
    filter: Option<&Filter>,
    sort: &[SortKey],
    request: PageRequest,
) -> QueryResult<Page<T>> {
    request.validate()?;
    let matched = select(records, filter, sort)?;

    let total_elements = matched.len() as u64;
    let size = u64::from(request.size);
    let total_pages = total_elements.div_ceil(size) as u32;
    let start = request.page as usize * request.size as usize;
    let content = matched
        .into_iter()
        .skip(start)
        .take(request.size as usize)
        .collect();

    Ok(Page {
        content,
        page: request.page,
        size: request.size,
        total_elements,
        total_pages,
    })
}

/// Filters, sorts and pages a snapshot without counting the whole result.
pub fn select_slice<T: Record + Clone>(
    records: &[T],
    filter: Option<&Filter>,
    sort: &[SortKey],
    request: PageRequest,
) -> QueryResult<Slice<T>> {
    request.validate()?;
    let matched = select(records, filter, sort)?;

    let start = request.page as usize * request.size as usize;
    let remaining = matched.len().saturating_sub(start);
    let content: Vec<T> = matched
        .into_iter()
        .skip(start)
        .take(request.size as usize)
        .collect();
    let has_next = remaining > content.len();

    Ok(Slice {
        content,
        page: request.page,
        size: request.size,
        has_next,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        id: i64,
        name: &'static str,
        rank: i64,
    }

    impl Record for Row {
        fn field(&self, path: &str) -> Option<FieldValue> {
            match path {
                "id" => Some(FieldValue::Integer(self.id)),
                "name" => Some(FieldValue::Text(self.name.to_string())),
                "rank" => Some(FieldValue::Integer(self.rank)),
                _ => None,
            }
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 1, name: "b", rank: 2 },
            Row { id: 2, name: "a", rank: 1 },
            Row { id: 3, name: "c", rank: 1 },
            Row { id: 4, name: "a", rank: 2 },
        ]
    }

    #[test]
    fn equals_filter_selects_matching_rows() {
        let out = select(&rows(), Some(&Filter::equals("name", "a")), &[]).unwrap();
        assert_eq!(out.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn unknown_field_is_an_error() {
        let err = select(&rows(), Some(&Filter::equals("missing", 1)), &[]).unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownField {
                field: "missing".to_string()
            }
        );
    }

    #[test]
    fn like_on_integer_field_is_a_type_mismatch() {
        let err = select(&rows(), Some(&Filter::like("id", "1%")), &[]).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }

    #[test]
    fn non_text_like_pattern_is_rejected_before_scanning() {
        let filter = Filter::All(vec![Condition {
            field: "name".to_string(),
            operator: Operator::Like,
            value: FieldValue::Integer(1),
        }]);
        // Patterns are prepared once up front, so even an empty snapshot
        // reports the mismatch.
        let empty: Vec<Row> = Vec::new();
        let err = select(&empty, Some(&filter), &[]).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }

    #[test]
    fn equals_ignore_case_matches_text_case_insensitively() {
        let filter = Filter::All(vec![Condition::equals_ignore_case("name", "A")]);
        let out = select(&rows(), Some(&filter), &[]).unwrap();
        assert_eq!(out.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 4]);

        // Non-text fields fall back to exact equality.
        let by_id = Filter::All(vec![Condition::equals_ignore_case("id", 3)]);
        let out = select(&rows(), Some(&by_id), &[]).unwrap();
        assert_eq!(out.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn multi_key_sort_is_stable() {
        let sorted = select(
            &rows(),
            None,
            &[SortKey::asc("rank"), SortKey::desc("name")],
        )
        .unwrap();
        // rank 1 first (c before a by descending name), then rank 2.
        assert_eq!(sorted.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2, 1, 4]);
    }

    #[test]
    fn page_reports_totals_and_ceil_page_count() {
        let page = select_page(&rows(), None, &[SortKey::asc("id")], PageRequest::new(1, 3)).unwrap();
        assert_eq!(page.total_elements, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.content.iter().map(|r| r.id).collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn page_beyond_data_is_empty_not_an_error() {
        let page = select_page(&rows(), None, &[], PageRequest::new(9, 2)).unwrap();
        assert!(page.content.is_empty());
        assert_eq!(page.total_elements, 4);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = select_page(&rows(), None, &[], PageRequest::new(0, 0)).unwrap_err();
        assert_eq!(err, QueryError::InvalidPageSize { size: 0 });
    }

    #[test]
    fn slice_reports_has_next_without_totals() {
        let first = select_slice(&rows(), None, &[SortKey::asc("id")], PageRequest::new(0, 3)).unwrap();
        assert!(first.has_next);
        let request = first.next_page().unwrap();
        let last = select_slice(&rows(), None, &[SortKey::asc("id")], request).unwrap();
        assert!(!last.has_next);
        assert_eq!(last.content.len(), 1);
        assert_eq!(last.next_page(), None);
    }

    #[test]
    fn count_and_exists_respect_filters() {
        let snapshot = rows();
        assert_eq!(count(&snapshot, Some(&Filter::equals("rank", 1))).unwrap(), 2);
        assert!(exists(&snapshot, Some(&Filter::like("name", "c%"))).unwrap());
        assert!(!exists(&snapshot, Some(&Filter::equals("name", "z"))).unwrap());
    }
}
