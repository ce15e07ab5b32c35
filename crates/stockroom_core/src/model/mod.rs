//! Catalog domain model.
//!
//! # Responsibility
//! - Define the canonical `Category` and `Product` records used by store,
//!   query and repository layers.
//! - Provide the projection shapes returned by reduced-field queries.
//!
//! # Invariants
//! - Identifiers are assigned by the store on first persist and are never
//!   mutated by model code.
//! - Write paths must call `validate()` before handing a record to the store.

pub mod category;
pub mod product;

pub use category::{Category, CategoryId, CategoryValidationError};
pub use product::{Product, ProductId, ProductPrice, ProductValidationError, SimpleProduct};
