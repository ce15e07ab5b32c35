//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `stockroom_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use stockroom_core::{Category, CategoryRepository, RepoError, Store, StoreCategoryRepository};

fn main() -> Result<(), RepoError> {
    println!("stockroom_core version={}", stockroom_core::core_version());

    let store = Store::new();
    let repo = StoreCategoryRepository::new(&store);
    let saved = store.required(None, |tx: &mut stockroom_core::Transaction<'_>| {
        repo.save(tx, &Category::new("SMOKE"))
    })?;

    println!(
        "stockroom_core smoke id={} categories={}",
        saved.id.unwrap_or_default(),
        store.category_count()
    );
    Ok(())
}
