use std::sync::Arc;
use stockroom_core::{
    Category, CategoryRepository, ExampleMatcher, FixedClock, RepoError, RepoResult, Store,
    StoreCategoryRepository, StoreConfig, StoreError, Transaction,
};

const T0: i64 = 1_700_000_000_000;

fn store_with_fixed_clock() -> (Store, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(T0));
    let store = Store::with_clock(StoreConfig::default(), clock.clone());
    (store, clock)
}

fn seed_category(store: &Store, name: &str) -> Category {
    let repo = StoreCategoryRepository::new(store);
    store
        .required(None, |tx: &mut Transaction<'_>| {
            repo.save(tx, &Category::new(name))
        })
        .unwrap()
}

#[test]
fn save_and_find_by_id_roundtrip() {
    let (store, _clock) = store_with_fixed_clock();
    let repo = StoreCategoryRepository::new(&store);

    let saved = seed_category(&store, "GADGET");

    let id = saved.id.unwrap();
    let loaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.name, "GADGET");
    assert_eq!(loaded.created_date, Some(T0));
    assert_eq!(loaded.last_modified_date, Some(T0));
}

#[test]
fn find_by_id_miss_is_none_not_an_error() {
    let (store, _clock) = store_with_fixed_clock();
    let repo = StoreCategoryRepository::new(&store);

    assert_eq!(repo.find_by_id(42).unwrap(), None);
}

#[test]
fn resave_preserves_created_date_and_refreshes_last_modified() {
    let (store, clock) = store_with_fixed_clock();
    let repo = StoreCategoryRepository::new(&store);

    let saved = seed_category(&store, "GADGET");
    clock.advance_ms(5_000);

    let mut renamed = saved.clone();
    renamed.name = "GADGET MURAH".to_string();
    let updated: Category = store
        .required(None, |tx: &mut Transaction<'_>| repo.save(tx, &renamed))
        .unwrap();

    assert_eq!(updated.id, saved.id);
    assert_eq!(updated.created_date, Some(T0));
    assert_eq!(updated.last_modified_date, Some(T0 + 5_000));

    let loaded = repo.find_by_id(saved.id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded.name, "GADGET MURAH");
    assert_eq!(loaded.created_date, Some(T0));
}

#[test]
fn derived_name_queries() {
    let (store, _clock) = store_with_fixed_clock();
    let repo = StoreCategoryRepository::new(&store);

    seed_category(&store, "GADGET MURAH");
    seed_category(&store, "FOOD");

    let found = repo
        .find_first_by_name_equals("GADGET MURAH")
        .unwrap()
        .unwrap();
    assert_eq!(found.name, "GADGET MURAH");

    assert_eq!(repo.find_first_by_name_equals("TOYS").unwrap(), None);

    let like = repo.find_all_by_name_like("GADGET%").unwrap();
    assert_eq!(like.len(), 1);
    assert_eq!(like[0].name, "GADGET MURAH");

    assert_eq!(repo.count().unwrap(), 2);
}

#[test]
fn query_by_example_matches_populated_probe_fields() {
    let (store, _clock) = store_with_fixed_clock();
    let repo = StoreCategoryRepository::new(&store);

    let gadget = seed_category(&store, "GADGET MURAH");
    seed_category(&store, "FOOD");

    let by_name = repo
        .find_all_by_example(&Category::new("GADGET MURAH"), ExampleMatcher::exact())
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "GADGET MURAH");

    // Exact matching is case-sensitive; the matcher opts into ignoring case.
    let wrong_case = Category::new("gadget murah");
    assert!(repo
        .find_all_by_example(&wrong_case, ExampleMatcher::exact())
        .unwrap()
        .is_empty());
    let relaxed = repo
        .find_all_by_example(&wrong_case, ExampleMatcher::ignoring_case())
        .unwrap();
    assert_eq!(relaxed.len(), 1);
    assert_eq!(relaxed[0].name, "GADGET MURAH");

    // Unset probe fields are ignored; an empty probe matches every row.
    let everything = repo
        .find_all_by_example(&Category::new(""), ExampleMatcher::exact())
        .unwrap();
    assert_eq!(everything.len(), 2);

    let mut by_id = Category::new("");
    by_id.id = gadget.id;
    let found = repo
        .find_all_by_example(&by_id, ExampleMatcher::exact())
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, gadget.id);
}

#[test]
fn delete_by_name_reports_removed_counts() {
    let (store, _clock) = store_with_fixed_clock();
    let repo = StoreCategoryRepository::new(&store);

    seed_category(&store, "TO REMOVE");

    let removed: u64 = store
        .required(None, |tx: &mut Transaction<'_>| {
            repo.delete_by_name(tx, "NEVER EXISTED")
        })
        .unwrap();
    assert_eq!(removed, 0);

    let removed: u64 = store
        .required(None, |tx: &mut Transaction<'_>| {
            repo.delete_by_name(tx, "TO REMOVE")
        })
        .unwrap();
    assert_eq!(removed, 1);

    let removed: u64 = store
        .required(None, |tx: &mut Transaction<'_>| {
            repo.delete_by_name(tx, "TO REMOVE")
        })
        .unwrap();
    assert_eq!(removed, 0);

    assert_eq!(store.category_count(), 0);
}

#[test]
fn delete_by_id_reports_removed_count() {
    let (store, _clock) = store_with_fixed_clock();
    let repo = StoreCategoryRepository::new(&store);

    let saved = seed_category(&store, "ONE SHOT");
    let id = saved.id.unwrap();

    let removed: u64 = store
        .required(None, |tx: &mut Transaction<'_>| repo.delete_by_id(tx, id))
        .unwrap();
    assert_eq!(removed, 1);

    let removed: u64 = store
        .required(None, |tx: &mut Transaction<'_>| repo.delete_by_id(tx, id))
        .unwrap();
    assert_eq!(removed, 0);
}

#[test]
fn save_with_unknown_id_is_rejected() {
    let (store, _clock) = store_with_fixed_clock();
    let repo = StoreCategoryRepository::new(&store);

    let mut phantom = Category::new("PHANTOM");
    phantom.id = Some(99);

    let result: RepoResult<Category> = store.required(None, |tx: &mut Transaction<'_>| {
        repo.save(tx, &phantom)
    });
    assert!(matches!(
        result,
        Err(RepoError::Store(StoreError::UnknownId(_)))
    ));
    assert_eq!(store.category_count(), 0);
}

#[test]
fn validation_failure_blocks_save() {
    let (store, _clock) = store_with_fixed_clock();
    let repo = StoreCategoryRepository::new(&store);

    let result: RepoResult<Category> = store.required(None, |tx: &mut Transaction<'_>| {
        repo.save(tx, &Category::new("   "))
    });
    assert!(matches!(result, Err(RepoError::CategoryValidation(_))));
    assert_eq!(store.category_count(), 0);
}
