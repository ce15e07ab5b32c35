//! Embedded transactional catalog store.
//! This crate is the single source of truth for store, query and transaction
//! invariants.

pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod store;
pub mod tx;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    Category, CategoryId, CategoryValidationError, Product, ProductId, ProductPrice,
    ProductValidationError, SimpleProduct,
};
pub use query::{
    Condition, Direction, ExampleMatcher, FieldValue, Filter, Operator, Page, PageRequest,
    QueryError, Record, Slice, SortKey,
};
pub use repo::{
    CategoryRepository, ProductRepository, RepoError, RepoResult, StoreCategoryRepository,
    StoreProductRepository,
};
pub use service::CategoryService;
pub use store::{
    AuditClock, EntityKey, EntityKind, FixedClock, Store, StoreConfig, StoreError, StoreResult,
    SystemClock,
};
pub use tx::{LockError, Propagation, Transaction, TxDefinition, TxError, TxId, TxState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
