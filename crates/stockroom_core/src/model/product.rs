//! Product domain record and its projections.
//!
//! # Responsibility
//! - Define the product row backing the `products` table shape.
//! - Define reduced-field projection shapes for partial reads.
//!
//! # Invariants
//! - `category_id` must resolve to an existing category at commit time; the
//!   store enforces this, not the model.
//! - Prices are integer minor currency units, never negative.

use crate::model::category::CategoryId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable numeric identifier for products.
pub type ProductId = i64;

/// Product record. Belongs to exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned identifier, `None` before first persist.
    pub id: Option<ProductId>,
    pub name: String,
    /// Price in minor currency units.
    pub price: i64,
    /// Required foreign key to the owning category.
    pub category_id: CategoryId,
}

/// Projection carrying only identity and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleProduct {
    pub id: ProductId,
    pub name: String,
}

/// Projection carrying only identity and price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPrice {
    pub id: ProductId,
    pub price: i64,
}

/// Validation failure for product write paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductValidationError {
    EmptyName,
    NegativePrice,
}

impl Display for ProductValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "product name must not be empty"),
            Self::NegativePrice => write!(f, "product price must not be negative"),
        }
    }
}

impl Error for ProductValidationError {}

impl Product {
    /// Creates an unpersisted product under the given category.
    pub fn new(name: impl Into<String>, price: i64, category_id: CategoryId) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            category_id,
        }
    }

    /// Checks write-path invariants.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        if self.name.trim().is_empty() {
            return Err(ProductValidationError::EmptyName);
        }
        if self.price < 0 {
            return Err(ProductValidationError::NegativePrice);
        }
        Ok(())
    }
}
