//! Committed table state.
//!
//! # Invariants
//! - Only a committing transaction mutates these maps, under the store mutex.
//! - The maps always satisfy the foreign-key invariant between commits.

use crate::model::{Category, CategoryId, Product, ProductId};
use std::collections::BTreeMap;

/// Last committed rows of both tables.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub(crate) categories: BTreeMap<CategoryId, Category>,
    pub(crate) products: BTreeMap<ProductId, Product>,
}
