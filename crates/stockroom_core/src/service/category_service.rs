//! Category batch use-cases.
//!
//! # Responsibility
//! - Create category batches under three demarcation styles: manual
//!   begin/commit, REQUIRED propagation and MANDATORY propagation.
//!
//! # Invariants
//! - A failing batch leaves the committed table untouched and re-raises the
//!   original failure, not a rollback error.

use crate::model::Category;
use crate::repo::{CategoryRepository, RepoResult, StoreCategoryRepository};
use crate::store::Store;
use crate::tx::Transaction;

/// Batch creation service over the category repository.
pub struct CategoryService<'s> {
    store: &'s Store,
    repo: StoreCategoryRepository<'s>,
}

impl<'s> CategoryService<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self {
            store,
            repo: StoreCategoryRepository::new(store),
        }
    }

    /// Creates all categories inside a manually demarcated transaction.
    ///
    /// Any failure rolls the transaction back and the original error is
    /// returned.
    pub fn create_batch(&self, names: &[&str]) -> RepoResult<Vec<Category>> {
        let mut tx = self.store.begin();
        match self.save_all(&mut tx, names) {
            Ok(saved) => {
                tx.commit()?;
                Ok(saved)
            }
            Err(err) => {
                // The body's failure is the real cause; rollback problems
                // must not mask it.
                let _ = tx.rollback();
                Err(err)
            }
        }
    }

    /// Creates all categories with REQUIRED propagation: joins `current` when
    /// supplied, otherwise runs in its own transaction.
    pub fn create_batch_required(
        &self,
        current: Option<&mut Transaction<'_>>,
        names: &[&str],
    ) -> RepoResult<Vec<Category>> {
        self.store
            .required(current, |tx: &mut Transaction<'_>| self.save_all(tx, names))
    }

    /// Creates all categories with MANDATORY propagation: fails with
    /// `NoActiveTransaction` unless `current` is supplied.
    pub fn create_batch_mandatory(
        &self,
        current: Option<&mut Transaction<'_>>,
        names: &[&str],
    ) -> RepoResult<Vec<Category>> {
        self.store
            .mandatory(current, |tx: &mut Transaction<'_>| self.save_all(tx, names))
    }

    fn save_all(&self, tx: &mut Transaction<'_>, names: &[&str]) -> RepoResult<Vec<Category>> {
        let mut saved = Vec::with_capacity(names.len());
        for name in names {
            saved.push(self.repo.save(tx, &Category::new(*name))?);
        }
        Ok(saved)
    }
}
