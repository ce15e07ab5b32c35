//! Category repository contract and store-backed implementation.
//!
//! # Responsibility
//! - Provide derived-query CRUD over the `categories` table.
//!
//! # Invariants
//! - Saves validate the model before buffering.
//! - Derived deletes evaluate the calling transaction's merged view, so rows
//!   saved earlier in the same transaction are visible to them.

use crate::model::{Category, CategoryId};
use crate::query::{self, Condition, ExampleMatcher, FieldValue, Filter, Record, SortKey};
use crate::repo::RepoResult;
use crate::store::Store;
use crate::tx::Transaction;

impl Record for Category {
    fn field(&self, path: &str) -> Option<FieldValue> {
        match path {
            "id" => self.id.map(FieldValue::Integer),
            "name" => Some(FieldValue::Text(self.name.clone())),
            "created_date" => self.created_date.map(FieldValue::Integer),
            "last_modified_date" => self.last_modified_date.map(FieldValue::Integer),
            _ => None,
        }
    }
}

/// Repository interface for category operations.
pub trait CategoryRepository {
    /// Persists the category and returns it with id and audit timestamps.
    fn save(&self, tx: &mut Transaction<'_>, category: &Category) -> RepoResult<Category>;
    fn find_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    fn find_first_by_name_equals(&self, name: &str) -> RepoResult<Option<Category>>;
    /// All categories whose name matches the SQL LIKE `pattern`.
    fn find_all_by_name_like(&self, pattern: &str) -> RepoResult<Vec<Category>>;
    fn find_all(&self, sort: &[SortKey]) -> RepoResult<Vec<Category>>;
    /// Query-by-example: every populated probe field becomes an equality
    /// condition; a probe with nothing set matches every row.
    fn find_all_by_example(
        &self,
        probe: &Category,
        matcher: ExampleMatcher,
    ) -> RepoResult<Vec<Category>>;
    fn count(&self) -> RepoResult<u64>;
    /// Removes one row by id; returns the removed count (0 or 1).
    fn delete_by_id(&self, tx: &mut Transaction<'_>, id: CategoryId) -> RepoResult<u64>;
    /// Removes every category with the exact name; returns the removed count.
    fn delete_by_name(&self, tx: &mut Transaction<'_>, name: &str) -> RepoResult<u64>;
}

/// Store-backed category repository.
pub struct StoreCategoryRepository<'s> {
    store: &'s Store,
}

impl<'s> StoreCategoryRepository<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    fn committed(&self) -> Vec<Category> {
        self.store.clone_tables().categories.into_values().collect()
    }
}

impl CategoryRepository for StoreCategoryRepository<'_> {
    fn save(&self, tx: &mut Transaction<'_>, category: &Category) -> RepoResult<Category> {
        category.validate()?;
        Ok(tx.save_category(category)?)
    }

    fn find_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        Ok(self.store.committed_category(id))
    }

    fn find_first_by_name_equals(&self, name: &str) -> RepoResult<Option<Category>> {
        let matched = query::select(
            &self.committed(),
            Some(&Filter::equals("name", name)),
            &[SortKey::asc("id")],
        )?;
        Ok(matched.into_iter().next())
    }

    fn find_all_by_name_like(&self, pattern: &str) -> RepoResult<Vec<Category>> {
        Ok(query::select(
            &self.committed(),
            Some(&Filter::like("name", pattern)),
            &[SortKey::asc("id")],
        )?)
    }

    fn find_all(&self, sort: &[SortKey]) -> RepoResult<Vec<Category>> {
        Ok(query::select(&self.committed(), None, sort)?)
    }

    fn find_all_by_example(
        &self,
        probe: &Category,
        matcher: ExampleMatcher,
    ) -> RepoResult<Vec<Category>> {
        let equals = |field: &str, value: FieldValue| {
            if matcher.ignore_case {
                Condition::equals_ignore_case(field, value)
            } else {
                Condition::equals(field, value)
            }
        };

        let mut conditions = Vec::new();
        if let Some(id) = probe.id {
            conditions.push(equals("id", FieldValue::Integer(id)));
        }
        if !probe.name.trim().is_empty() {
            conditions.push(equals("name", FieldValue::Text(probe.name.clone())));
        }
        if let Some(created) = probe.created_date {
            conditions.push(equals("created_date", FieldValue::Integer(created)));
        }
        if let Some(modified) = probe.last_modified_date {
            conditions.push(equals("last_modified_date", FieldValue::Integer(modified)));
        }

        let filter = (!conditions.is_empty()).then(|| Filter::all(conditions));
        Ok(query::select(
            &self.committed(),
            filter.as_ref(),
            &[SortKey::asc("id")],
        )?)
    }

    fn count(&self) -> RepoResult<u64> {
        Ok(query::count(&self.committed(), None)?)
    }

    fn delete_by_id(&self, tx: &mut Transaction<'_>, id: CategoryId) -> RepoResult<u64> {
        Ok(tx.delete_category(id)?)
    }

    fn delete_by_name(&self, tx: &mut Transaction<'_>, name: &str) -> RepoResult<u64> {
        let matched = query::select(
            &tx.categories(),
            Some(&Filter::equals("name", name)),
            &[],
        )?;

        let mut removed = 0;
        for category in matched {
            let Some(id) = category.id else { continue };
            removed += tx.delete_category(id)?;
        }
        Ok(removed)
    }
}
