//! Category domain record.
//!
//! # Responsibility
//! - Define the audited category row backing the `categories` table shape.
//!
//! # Invariants
//! - `id` is `None` until the store assigns one; assigned ids are immutable.
//! - `created_date` is set once on first persist; `last_modified_date` is
//!   refreshed by the store on every mutating save.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable numeric identifier for categories.
pub type CategoryId = i64;

/// Audited category record.
///
/// Products reference categories through `Product::category_id`; the category
/// side keeps no owned collection, mirroring a back-reference-only relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Store-assigned identifier, `None` before first persist.
    pub id: Option<CategoryId>,
    pub name: String,
    /// Epoch milliseconds, stamped once on first persist.
    pub created_date: Option<i64>,
    /// Epoch milliseconds, stamped on every mutating save.
    pub last_modified_date: Option<i64>,
}

/// Validation failure for category write paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryValidationError {
    EmptyName,
}

impl Display for CategoryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "category name must not be empty"),
        }
    }
}

impl Error for CategoryValidationError {}

impl Category {
    /// Creates an unpersisted category; the store assigns id and timestamps.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            created_date: None,
            last_modified_date: None,
        }
    }

    /// Checks write-path invariants.
    pub fn validate(&self) -> Result<(), CategoryValidationError> {
        if self.name.trim().is_empty() {
            return Err(CategoryValidationError::EmptyName);
        }
        Ok(())
    }
}
