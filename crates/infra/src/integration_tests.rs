//! Service-level tests over the in-memory store.
//!
//! Covers the full catalog + ledger flows: status rows and the operation
//! log stay mutually consistent through create/adjust/update/delete, failed
//! commits leave no partial writes, and the read projections behave.

use std::sync::Arc;

use labstock_catalog::ProductSpec;
use labstock_core::{DomainError, Page, ProductId};
use labstock_ledger::{OperationKind, TimeRange};

use crate::service::{CatalogService, LedgerService, ServiceError};
use crate::store::{InMemoryStore, InventoryStore, StoreError};

fn setup() -> (CatalogService, LedgerService, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let catalog = CatalogService::new(store.clone());
    let ledger = LedgerService::new(store.clone());
    (catalog, ledger, store)
}

fn beaker_spec() -> ProductSpec {
    ProductSpec::new("Beaker", "Beaker", "250 mL", "Glass").unwrap()
}

#[tokio::test]
async fn creating_a_product_seeds_status_and_history() {
    let (catalog, ledger, _) = setup();

    let product = catalog.create_product(beaker_spec(), 100).await.unwrap();

    let status = ledger.status(product.id_typed()).await.unwrap();
    assert_eq!(status.available_quantity, 100);

    let ops = ledger.operations(TimeRange::unbounded()).await.unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].kind, OperationKind::ProductAdded);
    assert_eq!(ops[0].quantity_change, 100);
    assert_eq!(ops[0].available_quantity, 100);
    assert_eq!(ops[0].snapshot.name(), "Beaker");
}

#[tokio::test]
async fn adjusting_updates_status_and_appends_an_operation() {
    let (catalog, ledger, _) = setup();
    let product = catalog.create_product(beaker_spec(), 100).await.unwrap();

    let status = ledger.adjust_quantity(product.id_typed(), -30).await.unwrap();
    assert_eq!(status.available_quantity, 70);

    let ops = ledger.operations(TimeRange::unbounded()).await.unwrap();
    let newest = &ops[0];
    assert_eq!(newest.kind, OperationKind::StockChange);
    assert_eq!(newest.quantity_change, -30);
    assert_eq!(newest.available_quantity, 70);
}

#[tokio::test]
async fn adjusting_an_unknown_product_writes_nothing() {
    let (_, ledger, store) = setup();

    let err = ledger
        .adjust_quantity(ProductId::new(999), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::NotFound)));

    assert!(store.statuses().await.unwrap().is_empty());
    assert!(
        store
            .operations(&TimeRange::unbounded())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn renaming_records_a_diff_and_leaves_quantity_alone() {
    let (catalog, ledger, _) = setup();
    let product = catalog.create_product(beaker_spec(), 100).await.unwrap();
    ledger.adjust_quantity(product.id_typed(), -30).await.unwrap();

    let renamed = ProductSpec::new("Flask", "Beaker", "250 mL", "Glass").unwrap();
    catalog
        .update_product(product.id_typed(), renamed)
        .await
        .unwrap();

    let status = ledger.status(product.id_typed()).await.unwrap();
    assert_eq!(status.available_quantity, 70);

    let ops = ledger.operations(TimeRange::unbounded()).await.unwrap();
    let newest = &ops[0];
    assert_eq!(newest.kind, OperationKind::ProductUpdated);
    assert_eq!(newest.quantity_change, 0);
    assert_eq!(newest.available_quantity, 70);
    assert_eq!(
        newest.change_description.as_deref(),
        Some("Name: Beaker -> Flask")
    );
    assert_eq!(newest.snapshot.name(), "Flask");
}

#[tokio::test]
async fn low_stock_uses_a_strict_threshold() {
    let (catalog, ledger, _) = setup();
    let product = catalog.create_product(beaker_spec(), 100).await.unwrap();
    ledger.adjust_quantity(product.id_typed(), -30).await.unwrap();

    let low = ledger.low_stock(75).await.unwrap();
    assert!(low.iter().any(|s| s.product_id == product.id_typed()));

    let low = ledger.low_stock(50).await.unwrap();
    assert!(low.iter().all(|s| s.product_id != product.id_typed()));

    // 70 == 70 is not low stock.
    let low = ledger.low_stock(70).await.unwrap();
    assert!(low.iter().all(|s| s.product_id != product.id_typed()));
}

#[tokio::test]
async fn deleting_removes_the_status_row_and_freezes_the_balance() {
    let (catalog, ledger, store) = setup();
    let product = catalog.create_product(beaker_spec(), 100).await.unwrap();
    ledger.adjust_quantity(product.id_typed(), -60).await.unwrap();

    catalog.delete_product(product.id_typed()).await.unwrap();

    assert!(store.product(product.id_typed()).await.unwrap().is_none());
    assert!(store.status(product.id_typed()).await.unwrap().is_none());

    let ops = ledger.operations(TimeRange::unbounded()).await.unwrap();
    let newest = &ops[0];
    assert_eq!(newest.kind, OperationKind::ProductDeleted);
    assert_eq!(newest.quantity_change, 0);
    assert_eq!(newest.available_quantity, 40);
    assert_eq!(newest.snapshot.name(), "Beaker");
    // History survives the deletion.
    assert_eq!(ops.len(), 3);
}

#[tokio::test]
async fn duplicate_products_are_rejected() {
    let (catalog, _, _) = setup();
    catalog.create_product(beaker_spec(), 0).await.unwrap();

    let err = catalog.create_product(beaker_spec(), 0).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::Conflict(_))
    ));
}

#[tokio::test]
async fn a_failed_commit_leaves_both_tables_unchanged() {
    let (catalog, ledger, store) = setup();
    let product = catalog.create_product(beaker_spec(), 100).await.unwrap();

    let statuses_before = store.statuses().await.unwrap();
    let ops_before = store.operations(&TimeRange::unbounded()).await.unwrap();

    store.fail_next_commit();
    let err = ledger
        .adjust_quantity(product.id_typed(), -30)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Store(StoreError::Unavailable(_))
    ));

    assert_eq!(store.statuses().await.unwrap(), statuses_before);
    assert_eq!(
        store.operations(&TimeRange::unbounded()).await.unwrap(),
        ops_before
    );
}

#[tokio::test]
async fn reads_are_idempotent() {
    let (catalog, ledger, _) = setup();
    let product = catalog.create_product(beaker_spec(), 100).await.unwrap();
    ledger.adjust_quantity(product.id_typed(), -5).await.unwrap();

    let first_statuses = ledger.statuses().await.unwrap();
    let second_statuses = ledger.statuses().await.unwrap();
    assert_eq!(first_statuses, second_statuses);

    let first_ops = ledger.operations(TimeRange::unbounded()).await.unwrap();
    let second_ops = ledger.operations(TimeRange::unbounded()).await.unwrap();
    assert_eq!(first_ops, second_ops);
}

#[tokio::test]
async fn operation_paging_returns_the_requested_window() {
    let (catalog, ledger, _) = setup();
    let product = catalog.create_product(beaker_spec(), 0).await.unwrap();
    for _ in 0..24 {
        ledger.adjust_quantity(product.id_typed(), 1).await.unwrap();
    }

    let page = ledger
        .operations_page(Page::new(2, 10), TimeRange::unbounded())
        .await
        .unwrap();

    // 25 rows total; page 2 of 10 is ranks 11-20 newest-first, i.e. ids 15..=6.
    assert_eq!(page.total_count, 25);
    let ids: Vec<i64> = page.operations.iter().map(|op| op.id.as_i64()).collect();
    assert_eq!(ids, (6..=15).rev().collect::<Vec<i64>>());
}

#[tokio::test]
async fn balance_always_equals_the_sum_of_recorded_deltas() {
    let (catalog, ledger, _) = setup();
    let product = catalog.create_product(beaker_spec(), 100).await.unwrap();

    for delta in [-30, 12, 0, -45, 7] {
        ledger.adjust_quantity(product.id_typed(), delta).await.unwrap();
    }
    let renamed = ProductSpec::new("Flask", "Beaker", "250 mL", "Glass").unwrap();
    catalog
        .update_product(product.id_typed(), renamed)
        .await
        .unwrap();

    let status = ledger.status(product.id_typed()).await.unwrap();
    let ops = ledger.operations(TimeRange::unbounded()).await.unwrap();
    let sum: i64 = ops
        .iter()
        .filter(|op| op.product_id == product.id_typed())
        .map(|op| op.quantity_change)
        .sum();

    assert_eq!(status.available_quantity, sum);
    assert_eq!(status.available_quantity, 44);
}

#[tokio::test]
async fn quantity_may_be_driven_negative() {
    let (catalog, ledger, _) = setup();
    let product = catalog.create_product(beaker_spec(), 10).await.unwrap();

    let status = ledger.adjust_quantity(product.id_typed(), -25).await.unwrap();
    assert_eq!(status.available_quantity, -15);
}

#[tokio::test]
async fn update_of_missing_product_is_not_found() {
    let (catalog, _, store) = setup();

    let err = catalog
        .update_product(ProductId::new(404), beaker_spec())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::NotFound)));
    assert!(
        store
            .operations(&TimeRange::unbounded())
            .await
            .unwrap()
            .is_empty()
    );
}
