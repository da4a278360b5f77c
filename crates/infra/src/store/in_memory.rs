use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use labstock_catalog::{Product, ProductPage, ProductPageQuery, ProductSort, ProductSpec};
use labstock_core::{OperationId, Page, ProductId};
use labstock_ledger::{InventoryOperation, InventoryStatus, OperationPage, TimeRange};

use super::r#trait::{
    CommitReceipt, CommitUnit, InventoryStore, ProductWrite, StatusWrite, StoreError,
};

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<i64, Product>,
    statuses: BTreeMap<i64, InventoryStatus>,
    operations: Vec<InventoryOperation>,
    last_product_id: i64,
    last_operation_id: i64,
}

/// In-memory transactional store.
///
/// Intended for tests/dev. Not optimized for performance. Commits are atomic
/// by construction: every write in the unit is validated under the write
/// lock before any state is touched.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<State>,
    fail_next_commit: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `commit` fail with `StoreError::Unavailable` without
    /// touching any state. Lets tests observe that a failed unit leaves both
    /// the status table and the operation log unchanged.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

/// Newest first: `occurred_at` descending, id descending as the tiebreak.
fn sort_newest_first(ops: &mut [InventoryOperation]) {
    ops.sort_by(|a, b| {
        b.occurred_at
            .cmp(&a.occurred_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

impl State {
    fn filtered_operations(&self, range: &TimeRange) -> Vec<InventoryOperation> {
        let mut ops: Vec<InventoryOperation> = self
            .operations
            .iter()
            .filter(|op| range.contains(op.occurred_at))
            .cloned()
            .collect();
        sort_newest_first(&mut ops);
        ops
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn next_product_id(&self) -> Result<ProductId, StoreError> {
        let mut state = self.write()?;
        state.last_product_id += 1;
        Ok(ProductId::new(state.last_product_id))
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id.as_i64()).cloned())
    }

    async fn products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    async fn contains_spec(&self, spec: &ProductSpec) -> Result<bool, StoreError> {
        Ok(self.read()?.products.values().any(|p| p.spec() == spec))
    }

    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .read()?
            .products
            .values()
            .filter(|p| p.name().contains(fragment))
            .cloned()
            .collect())
    }

    async fn products_by_kind(&self, kind: &str) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .read()?
            .products
            .values()
            .filter(|p| p.kind() == kind)
            .cloned()
            .collect())
    }

    async fn products_page(&self, query: &ProductPageQuery) -> Result<ProductPage, StoreError> {
        let mut products: Vec<Product> = self.read()?.products.values().cloned().collect();

        match query.sort_by {
            Some(ProductSort::Name) => products.sort_by(|a, b| a.name().cmp(b.name())),
            Some(ProductSort::Kind) => products.sort_by(|a, b| a.kind().cmp(b.kind())),
            None => {}
        }
        if query.descending {
            products.reverse();
        }

        let total_count = products.len() as u64;
        let products = products
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.limit() as usize)
            .collect();

        Ok(ProductPage {
            products,
            total_count,
        })
    }

    async fn status(&self, id: ProductId) -> Result<Option<InventoryStatus>, StoreError> {
        Ok(self.read()?.statuses.get(&id.as_i64()).copied())
    }

    async fn statuses(&self) -> Result<Vec<InventoryStatus>, StoreError> {
        Ok(self.read()?.statuses.values().copied().collect())
    }

    async fn low_stock(&self, threshold: i64) -> Result<Vec<InventoryStatus>, StoreError> {
        Ok(self
            .read()?
            .statuses
            .values()
            .filter(|s| s.is_low_stock(threshold))
            .copied()
            .collect())
    }

    async fn operations(&self, range: &TimeRange) -> Result<Vec<InventoryOperation>, StoreError> {
        Ok(self.read()?.filtered_operations(range))
    }

    async fn operations_page(
        &self,
        page: Page,
        range: &TimeRange,
    ) -> Result<OperationPage, StoreError> {
        let ops = self.read()?.filtered_operations(range);
        let total_count = ops.len() as u64;
        let operations = ops
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();

        Ok(OperationPage {
            operations,
            total_count,
        })
    }

    async fn commit(&self, unit: CommitUnit) -> Result<CommitReceipt, StoreError> {
        let mut state = self.write()?;

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "injected failure: commit aborted".to_string(),
            ));
        }

        // Validate the whole unit before touching any state; the mutations
        // below are infallible, which is what makes the commit atomic.
        match &unit.product {
            Some(ProductWrite::Insert(product)) => {
                if state.products.contains_key(&product.id_typed().as_i64()) {
                    return Err(StoreError::Constraint(format!(
                        "product {} already exists",
                        product.id_typed()
                    )));
                }
            }
            Some(ProductWrite::Update(product)) => {
                if !state.products.contains_key(&product.id_typed().as_i64()) {
                    return Err(StoreError::InvalidCommit(format!(
                        "update of missing product {}",
                        product.id_typed()
                    )));
                }
            }
            Some(ProductWrite::Remove(id)) => {
                if !state.products.contains_key(&id.as_i64()) {
                    return Err(StoreError::InvalidCommit(format!(
                        "removal of missing product {id}"
                    )));
                }
            }
            None => {}
        }

        match unit.product {
            Some(ProductWrite::Insert(product)) | Some(ProductWrite::Update(product)) => {
                state.products.insert(product.id_typed().as_i64(), product);
            }
            Some(ProductWrite::Remove(id)) => {
                state.products.remove(&id.as_i64());
            }
            None => {}
        }

        match unit.status {
            Some(StatusWrite::Upsert(status)) => {
                state.statuses.insert(status.product_id.as_i64(), status);
            }
            Some(StatusWrite::Remove(id)) => {
                state.statuses.remove(&id.as_i64());
            }
            None => {}
        }

        let operation = unit.operation.map(|op| {
            state.last_operation_id += 1;
            let committed =
                InventoryOperation::committed(OperationId::new(state.last_operation_id), op);
            state.operations.push(committed.clone());
            committed
        });

        Ok(CommitReceipt { operation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use labstock_ledger::NewOperation;

    fn product(id: i64, name: &str) -> Product {
        Product::new(
            ProductId::new(id),
            ProductSpec::new(name, "Beaker", "250 mL", "Glass").unwrap(),
        )
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    async fn append_stock_change(store: &InMemoryStore, p: &Product, delta: i64, hour: u32) {
        let status = InventoryStatus::new(p.id_typed(), delta);
        let op = NewOperation::stock_change(p, delta, delta, at(hour));
        store
            .commit(CommitUnit::adjustment(status, op))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn operation_ids_are_monotonic() {
        let store = InMemoryStore::new();
        let p = product(1, "Glass Beaker");
        store
            .commit(CommitUnit::product_created(
                p.clone(),
                InventoryStatus::new(p.id_typed(), 0),
                NewOperation::product_added(&p, 0, at(9)),
            ))
            .await
            .unwrap();

        append_stock_change(&store, &p, 5, 10).await;
        append_stock_change(&store, &p, 7, 11).await;

        let ids: Vec<i64> = store
            .operations(&TimeRange::unbounded())
            .await
            .unwrap()
            .iter()
            .map(|op| op.id.as_i64())
            .collect();
        // Newest first.
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn injected_failure_leaves_state_untouched() {
        let store = InMemoryStore::new();
        let p = product(1, "Glass Beaker");

        store.fail_next_commit();
        let err = store
            .commit(CommitUnit::product_created(
                p.clone(),
                InventoryStatus::new(p.id_typed(), 10),
                NewOperation::product_added(&p, 10, at(9)),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.products().await.unwrap().is_empty());
        assert!(store.statuses().await.unwrap().is_empty());
        assert!(
            store
                .operations(&TimeRange::unbounded())
                .await
                .unwrap()
                .is_empty()
        );

        // The failure is one-shot: the retried commit goes through.
        store
            .commit(CommitUnit::product_created(
                p.clone(),
                InventoryStatus::new(p.id_typed(), 10),
                NewOperation::product_added(&p, 10, at(9)),
            ))
            .await
            .unwrap();
        assert_eq!(store.products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn time_range_filters_inclusively() {
        let store = InMemoryStore::new();
        let p = product(1, "Glass Beaker");
        store
            .commit(CommitUnit::product_created(
                p.clone(),
                InventoryStatus::new(p.id_typed(), 0),
                NewOperation::product_added(&p, 0, at(8)),
            ))
            .await
            .unwrap();
        for hour in [9, 12, 17, 20] {
            append_stock_change(&store, &p, 1, hour).await;
        }

        let window = TimeRange::new(Some(at(9)), Some(at(17)));
        let ops = store.operations(&window).await.unwrap();
        let hours: Vec<u32> = ops
            .iter()
            .map(|op| {
                use chrono::Timelike;
                op.occurred_at.hour()
            })
            .collect();
        assert_eq!(hours, vec![17, 12, 9]);
    }

    #[tokio::test]
    async fn paging_windows_the_newest_first_ordering() {
        let store = InMemoryStore::new();
        let p = product(1, "Glass Beaker");
        store
            .commit(CommitUnit::product_created(
                p.clone(),
                InventoryStatus::new(p.id_typed(), 0),
                NewOperation::product_added(&p, 0, at(0)),
            ))
            .await
            .unwrap();
        for hour in 1..=22 {
            append_stock_change(&store, &p, 1, hour).await;
        }

        let page = store
            .operations_page(Page::new(2, 10), &TimeRange::unbounded())
            .await
            .unwrap();
        assert_eq!(page.total_count, 23);
        let ids: Vec<i64> = page.operations.iter().map(|op| op.id.as_i64()).collect();
        assert_eq!(ids, (4..=13).rev().collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn product_page_sorts_and_counts() {
        let store = InMemoryStore::new();
        for (id, name) in [(1, "Beaker"), (2, "Ampoule"), (3, "Cylinder")] {
            let p = product(id, name);
            store
                .commit(CommitUnit::product_created(
                    p.clone(),
                    InventoryStatus::new(p.id_typed(), 0),
                    NewOperation::product_added(&p, 0, at(1)),
                ))
                .await
                .unwrap();
        }

        let page = store
            .products_page(&ProductPageQuery {
                page: Page::new(1, 2),
                sort_by: Some(ProductSort::Name),
                descending: false,
            })
            .await
            .unwrap();

        assert_eq!(page.total_count, 3);
        let names: Vec<&str> = page.products.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Ampoule", "Beaker"]);
    }
}
