use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use labstock_core::{Page, ProductId};
use labstock_ledger::{
    InventoryOperation, InventoryStatus, NewOperation, OperationPage, TimeRange,
};

use super::ServiceError;
use crate::store::{CommitUnit, InventoryStore};

/// The single authority for mutating stock levels.
///
/// Every adjustment updates the status row and appends its audit-trail
/// operation in one atomic commit, so the running balance can never drift
/// from the sum of its history. Reads are plain projections.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn InventoryStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Apply a signed delta to a product's stock level.
    ///
    /// The product must exist; adjusting an unknown id is rejected with
    /// `NotFound` and writes nothing. The status row is created lazily (at
    /// quantity zero) on the first adjustment. Zero deltas are permitted.
    /// There is no idempotency key: a retried call applies its delta again.
    #[instrument(skip(self), err)]
    pub async fn adjust_quantity(
        &self,
        product_id: ProductId,
        delta: i64,
    ) -> Result<InventoryStatus, ServiceError> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or(labstock_core::DomainError::NotFound)?;

        let current = self
            .store
            .status(product_id)
            .await?
            .unwrap_or_else(|| InventoryStatus::empty(product_id));
        let updated = current.with_delta(delta);

        let operation =
            NewOperation::stock_change(&product, delta, updated.available_quantity, Utc::now());
        self.store
            .commit(CommitUnit::adjustment(updated, operation))
            .await?;

        tracing::info!(
            product_id = %product_id,
            delta,
            available_quantity = updated.available_quantity,
            "stock adjusted"
        );
        Ok(updated)
    }

    /// Current status of one product; `NotFound` when it has no status row.
    pub async fn status(&self, product_id: ProductId) -> Result<InventoryStatus, ServiceError> {
        self.store
            .status(product_id)
            .await?
            .ok_or(labstock_core::DomainError::NotFound.into())
    }

    pub async fn statuses(&self) -> Result<Vec<InventoryStatus>, ServiceError> {
        Ok(self.store.statuses().await?)
    }

    /// Status rows strictly below `threshold`.
    pub async fn low_stock(&self, threshold: i64) -> Result<Vec<InventoryStatus>, ServiceError> {
        Ok(self.store.low_stock(threshold).await?)
    }

    /// Operation log, newest first, optionally bounded in time.
    pub async fn operations(
        &self,
        range: TimeRange,
    ) -> Result<Vec<InventoryOperation>, ServiceError> {
        Ok(self.store.operations(&range).await?)
    }

    pub async fn operations_page(
        &self,
        page: Page,
        range: TimeRange,
    ) -> Result<OperationPage, ServiceError> {
        Ok(self.store.operations_page(page, &range).await?)
    }
}
