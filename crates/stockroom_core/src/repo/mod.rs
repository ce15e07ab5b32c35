//! Repository layer: derived-query surfaces over the entity store.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity.
//! - Translate repository calls into query descriptors dispatched against
//!   store snapshots.
//!
//! # Invariants
//! - Write paths call model `validate()` before handing rows to the store.
//! - Lookup misses are `Ok(None)` or count 0, never errors.
//! - Mutating methods require an explicit transaction handle; pure reads see
//!   the last committed state.

pub mod category_repo;
pub mod product_repo;

pub use category_repo::{CategoryRepository, StoreCategoryRepository};
pub use product_repo::{ProductRepository, StoreProductRepository};

use crate::model::{CategoryValidationError, ProductValidationError};
use crate::query::QueryError;
use crate::store::StoreError;
use crate::tx::{LockError, TxError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error aggregating validation, store and query failures.
#[derive(Debug)]
pub enum RepoError {
    CategoryValidation(CategoryValidationError),
    ProductValidation(ProductValidationError),
    Store(StoreError),
    Query(QueryError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CategoryValidation(err) => write!(f, "{err}"),
            Self::ProductValidation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CategoryValidation(err) => Some(err),
            Self::ProductValidation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Query(err) => Some(err),
        }
    }
}

impl From<CategoryValidationError> for RepoError {
    fn from(value: CategoryValidationError) -> Self {
        Self::CategoryValidation(value)
    }
}

impl From<ProductValidationError> for RepoError {
    fn from(value: ProductValidationError) -> Self {
        Self::ProductValidation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<QueryError> for RepoError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<TxError> for RepoError {
    fn from(value: TxError) -> Self {
        Self::Store(StoreError::Tx(value))
    }
}

impl From<LockError> for RepoError {
    fn from(value: LockError) -> Self {
        Self::Store(StoreError::Lock(value))
    }
}
