//! Unit-of-work behaviour of the in-memory store seen through the generic
//! repository traits.

mod support;

use skistore::catalog::{self, seed, ProductSpecParams};
use skistore::db::repositories::LocalStore;
use skistore::db::{Criterion, DataStore, RepositoryError, Specification};
use skistore::models::{Product, ProductField, ScalarValue};

use support::{catalog as sample_catalog, product};

fn seeded() -> LocalStore<Product> {
    LocalStore::with_rows(sample_catalog())
}

#[tokio::test]
async fn test_contexts_are_isolated_until_commit() {
    let store = seeded();
    let mut writer = store.begin();
    let reader = store.begin();

    writer.add(product("Slalom Skis", "Skis", "Atomic", 700.0));
    assert!(!reader.exists(7).await.unwrap());
    assert!(!writer.exists(7).await.unwrap());

    assert!(writer.commit().await.unwrap());
    assert!(reader.exists(7).await.unwrap());
}

#[tokio::test]
async fn test_dropped_context_discards_staged_changes() {
    let store = seeded();
    {
        let mut repo = store.begin();
        let first = repo.get_by_id(1).await.unwrap().unwrap();
        repo.remove(first);
    }
    assert_eq!(store.len(), 6);
}

#[tokio::test]
async fn test_last_committed_update_wins() {
    let store = seeded();
    let mut first = store.begin();
    let mut second = store.begin();

    let mut a = first.get_by_id(2).await.unwrap().unwrap();
    let mut b = second.get_by_id(2).await.unwrap().unwrap();
    a.price = 400.0;
    b.price = 380.0;

    first.update(a);
    second.update(b);
    assert!(first.commit().await.unwrap());
    assert!(second.commit().await.unwrap());

    let stored = store.begin().get_by_id(2).await.unwrap().unwrap();
    assert_eq!(stored.price, 380.0);
}

#[tokio::test]
async fn test_update_of_concurrently_removed_row_fails_whole_commit() {
    let store = seeded();
    let mut remover = store.begin();
    let mut updater = store.begin();

    let target = remover.get_by_id(3).await.unwrap().unwrap();
    let mut edited = updater.get_by_id(3).await.unwrap().unwrap();
    edited.quantity_in_stock = 0;

    remover.remove(target);
    assert!(remover.commit().await.unwrap());

    updater.add(product("Slalom Skis", "Skis", "Atomic", 700.0));
    updater.update(edited);
    let err = updater.commit().await.unwrap_err();
    assert!(matches!(err, RepositoryError::TransactionError { .. }));

    // The add staged alongside the failed update is not applied either.
    assert_eq!(store.len(), 5);
    assert!(updater.inserted().is_empty());
}

#[tokio::test]
async fn test_commit_reports_inserted_rows_once() {
    let store = LocalStore::new();
    let mut repo = store.begin();

    repo.add(product("A", "Skis", "X", 10.0));
    repo.add(product("B", "Skis", "X", 20.0));
    assert!(repo.commit().await.unwrap());
    let ids: Vec<i32> = repo.inserted().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2]);

    assert!(!repo.commit().await.unwrap());
    assert!(repo.inserted().is_empty());
}

#[tokio::test]
async fn test_catalog_specifications_against_store() {
    let store = seeded();
    let repo = store.begin();

    let params = ProductSpecParams {
        types: Some("Skis".to_string()),
        sort: Some("priceDesc".to_string()),
        page_size: Some(2),
        ..Default::default()
    };
    let page = repo
        .get_all_with_spec(&catalog::product_spec(&params))
        .await
        .unwrap();
    let names: Vec<&str> = page.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Race Skis", "Park Skis"]);

    let total = repo
        .count_with_spec(&catalog::product_count_spec(&params))
        .await
        .unwrap();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn test_projection_needs_selector() {
    let store = seeded();
    let repo = store.begin();

    let err = repo
        .select_with_spec(&Specification::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));

    let brands = repo.select_with_spec(&catalog::brand_spec()).await.unwrap();
    assert_eq!(
        brands,
        vec![
            ScalarValue::from("Atomic"),
            ScalarValue::from("Leki"),
            ScalarValue::from("Salomon"),
        ]
    );
}

#[tokio::test]
async fn test_get_one_with_spec() {
    let store = seeded();
    let repo = store.begin();

    let cheapest = Specification::new()
        .filter(Criterion::Eq(ProductField::Type, "Boots".into()))
        .order_by(ProductField::Price);
    let found = repo.get_one_with_spec(&cheapest).await.unwrap().unwrap();
    assert_eq!(found.name, "Touring Boots");

    let nothing = Specification::new().filter(Criterion::In(ProductField::Brand, vec![]));
    assert!(repo.get_one_with_spec(&nothing).await.unwrap().is_none());
}

#[tokio::test]
async fn test_bundled_seed_file_loads_once() {
    let products = seed::load_products("data/products.json").unwrap();
    assert!(!products.is_empty());

    let store = LocalStore::new();
    let inserted = seed::seed_if_empty(&store, products.clone()).await.unwrap();
    assert_eq!(inserted, products.len());
    assert_eq!(store.len(), products.len());

    assert_eq!(seed::seed_if_empty(&store, products).await.unwrap(), 0);
}

#[tokio::test]
async fn test_seed_on_unhealthy_store_fails() {
    let store = LocalStore::new();
    store.set_healthy(false);

    let err = seed::seed_if_empty(&store, sample_catalog())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}
