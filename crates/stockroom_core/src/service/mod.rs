//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into unit-of-work level APIs.
//! - Demonstrate manual vs propagation-driven transaction demarcation.

pub mod category_service;

pub use category_service::CategoryService;
