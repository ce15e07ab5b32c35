use std::sync::Arc;
use std::time::Duration;
use stockroom_core::{
    Category, CategoryRepository, CategoryService, Product, ProductRepository, RepoError,
    RepoResult, Store, StoreCategoryRepository, StoreConfig, StoreError, StoreProductRepository,
    Transaction, TxDefinition, TxError, TxState,
};

#[test]
fn manual_batch_commits_all_rows() {
    let store = Store::new();
    let service = CategoryService::new(&store);

    let saved = service
        .create_batch(&["Category 0", "Category 1", "Category 2", "Category 3", "Category 4"])
        .unwrap();

    assert_eq!(saved.len(), 5);
    assert!(saved.iter().all(|category| category.id.is_some()));
    assert_eq!(store.category_count(), 5);
}

#[test]
fn failed_batch_leaves_entity_count_unchanged() {
    let store = Store::new();
    let service = CategoryService::new(&store);
    service.create_batch(&["EXISTING"]).unwrap();

    // The blank name fails validation after two rows were already buffered.
    let result = service.create_batch(&["Category 0", "Category 1", "  "]);
    assert!(matches!(result, Err(RepoError::CategoryValidation(_))));

    assert_eq!(store.category_count(), 1);
    assert_eq!(store.active_transactions(), 0);
}

#[test]
fn required_without_handle_runs_its_own_transaction() {
    let store = Store::new();
    let service = CategoryService::new(&store);

    service.create_batch_required(None, &["A", "B"]).unwrap();
    assert_eq!(store.category_count(), 2);
}

#[test]
fn required_joins_the_supplied_transaction() {
    let store = Store::new();
    let service = CategoryService::new(&store);

    let mut tx = store.begin();
    service
        .create_batch_required(Some(&mut tx), &["A", "B"])
        .unwrap();

    // Joined work commits with the outer transaction, not before.
    assert_eq!(store.category_count(), 0);
    tx.commit().unwrap();
    assert_eq!(store.category_count(), 2);
}

#[test]
fn joined_work_is_discarded_when_the_outer_transaction_rolls_back() {
    let store = Store::new();
    let service = CategoryService::new(&store);

    let mut tx = store.begin();
    service
        .create_batch_required(Some(&mut tx), &["A", "B"])
        .unwrap();
    tx.rollback().unwrap();

    assert_eq!(store.category_count(), 0);
}

#[test]
fn mandatory_without_handle_fails() {
    let store = Store::new();
    let service = CategoryService::new(&store);

    let result = service.create_batch_mandatory(None, &["A"]);
    assert!(matches!(
        result,
        Err(RepoError::Store(StoreError::Tx(TxError::NoActiveTransaction)))
    ));
    assert_eq!(store.category_count(), 0);
}

#[test]
fn mandatory_joins_the_supplied_transaction() {
    let store = Store::new();
    let service = CategoryService::new(&store);

    let mut tx = store.begin();
    service
        .create_batch_mandatory(Some(&mut tx), &["A", "B", "C"])
        .unwrap();
    tx.commit().unwrap();

    assert_eq!(store.category_count(), 3);
}

#[test]
fn expired_transaction_is_rolled_back_and_reports_timeout() {
    let store = Store::with_config(StoreConfig {
        transaction_timeout: Some(Duration::from_millis(10)),
        ..StoreConfig::default()
    });
    let repo = StoreCategoryRepository::new(&store);

    let mut tx = store.begin();
    repo.save(&mut tx, &Category::new("EARLY")).unwrap();
    std::thread::sleep(Duration::from_millis(30));

    let late = repo.save(&mut tx, &Category::new("LATE"));
    assert!(matches!(
        late,
        Err(RepoError::Store(StoreError::Tx(TxError::Timeout { .. })))
    ));
    assert_eq!(tx.state(), TxState::RolledBack);

    let commit = tx.commit();
    assert!(matches!(
        commit,
        Err(StoreError::Tx(TxError::NotActive { .. }))
    ));
    assert_eq!(store.category_count(), 0);
}

#[test]
fn explicit_definition_timeout_overrides_store_default() {
    let store = Store::new();
    let repo = StoreCategoryRepository::new(&store);

    let definition = TxDefinition::required().with_timeout(Duration::from_millis(10));
    let result: RepoResult<Category> = store.execute(&definition, None, |tx: &mut Transaction<'_>| {
        std::thread::sleep(Duration::from_millis(30));
        repo.save(tx, &Category::new("TOO LATE"))
    });

    assert!(matches!(
        result,
        Err(RepoError::Store(StoreError::Tx(TxError::Timeout { .. })))
    ));
    assert_eq!(store.category_count(), 0);
}

#[test]
fn dropping_an_active_transaction_rolls_back() {
    let store = Store::new();
    let repo = StoreCategoryRepository::new(&store);

    {
        let mut tx = store.begin();
        repo.save(&mut tx, &Category::new("EPHEMERAL")).unwrap();
        assert_eq!(store.active_transactions(), 1);
    }

    assert_eq!(store.category_count(), 0);
    assert_eq!(store.active_transactions(), 0);
}

#[test]
fn each_transaction_gets_a_fresh_id() {
    let store = Store::new();

    let tx = store.begin();
    let id = tx.id();
    tx.rollback().unwrap();

    let tx = store.begin();
    assert_ne!(tx.id(), id);
    tx.commit().unwrap();
}

#[test]
fn concurrent_transactions_on_distinct_entities_do_not_block() {
    let store = Arc::new(Store::new());

    let mut handles = Vec::new();
    for index in 0..4 {
        let store = Arc::clone(&store);
        handles.push(std::thread::spawn(move || {
            let repo = StoreCategoryRepository::new(&store);
            let saved: Category = store
                .required(None, |tx: &mut Transaction<'_>| {
                    repo.save(tx, &Category::new(format!("Category {index}")))
                })
                .unwrap();
            saved.id.unwrap()
        }));
    }

    let mut ids: Vec<i64> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), 4);
    assert_eq!(store.category_count(), 4);
}

#[test]
fn constraint_violation_inside_required_rolls_back_everything() {
    let store = Store::new();
    let categories = StoreCategoryRepository::new(&store);
    let products = StoreProductRepository::new(&store);

    let result: RepoResult<()> = store.required(None, |tx: &mut Transaction<'_>| {
        categories.save(tx, &Category::new("VALID"))?;
        products.save(tx, &Product::new("Dangling", 100, 777))?;
        Ok(())
    });

    // The violation surfaces from commit inside `required`; the valid row
    // buffered alongside it is discarded too.
    assert!(matches!(
        result,
        Err(RepoError::Store(StoreError::ForeignKeyViolation { .. }))
    ));
    assert_eq!(store.category_count(), 0);
    assert_eq!(store.product_count(), 0);
}
