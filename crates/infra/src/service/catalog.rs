use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use labstock_catalog::{Product, ProductPage, ProductPageQuery, ProductSpec};
use labstock_core::{DomainError, ProductId};
use labstock_ledger::{InventoryStatus, NewOperation};

use super::ServiceError;
use crate::store::{CommitUnit, InventoryStore};

/// Product catalog: identity and descriptive attributes.
///
/// Catalog mutations participate in the ledger: creation seeds the status
/// row and the opening `ProductAdded` operation, edits append the diff
/// operation, and deletion freezes the last balance into a final
/// `ProductDeleted` row, each inside the same commit as the product write.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn InventoryStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Add a product with an opening balance.
    ///
    /// Rejects a whole-attribute duplicate (same name/type/size/material)
    /// with `Conflict`. The id is allocated by the store; the product row,
    /// its status row, and the `ProductAdded` operation commit together.
    #[instrument(skip(self, spec), err)]
    pub async fn create_product(
        &self,
        spec: ProductSpec,
        initial_quantity: i64,
    ) -> Result<Product, ServiceError> {
        if self.store.contains_spec(&spec).await? {
            return Err(DomainError::conflict("duplicate product").into());
        }

        let id = self.store.next_product_id().await?;
        let product = Product::new(id, spec);
        let status = InventoryStatus::new(id, initial_quantity);
        let operation = NewOperation::product_added(&product, initial_quantity, Utc::now());

        self.store
            .commit(CommitUnit::product_created(
                product.clone(),
                status,
                operation,
            ))
            .await?;

        tracing::info!(product_id = %id, initial_quantity, "product created");
        Ok(product)
    }

    pub async fn product(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.store
            .product(id)
            .await?
            .ok_or(DomainError::NotFound.into())
    }

    pub async fn products(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.products().await?)
    }

    /// Replace a product's attributes and record the field-level diff.
    ///
    /// The operation row snapshots the new values; its description lists the
    /// changed fields (or is empty when the edit changed nothing). The stock
    /// level is untouched.
    #[instrument(skip(self, spec), err)]
    pub async fn update_product(
        &self,
        id: ProductId,
        spec: ProductSpec,
    ) -> Result<Product, ServiceError> {
        let old = self
            .store
            .product(id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let new = Product::new(id, spec);

        let quantity = self
            .store
            .status(id)
            .await?
            .map(|s| s.available_quantity)
            .unwrap_or(0);
        let operation = NewOperation::product_updated(&old, &new, quantity, Utc::now());

        self.store
            .commit(CommitUnit::product_updated(new.clone(), operation))
            .await?;

        tracing::info!(product_id = %id, "product updated");
        Ok(new)
    }

    /// Remove a product together with its status row.
    ///
    /// The last known balance is read before the status row goes away and
    /// frozen into the final `ProductDeleted` operation. History rows are
    /// kept forever.
    #[instrument(skip(self), err)]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ServiceError> {
        let product = self
            .store
            .product(id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let last_quantity = self
            .store
            .status(id)
            .await?
            .map(|s| s.available_quantity)
            .unwrap_or(0);
        let operation = NewOperation::product_deleted(&product, last_quantity, Utc::now());

        self.store
            .commit(CommitUnit::product_deleted(id, operation))
            .await?;

        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    pub async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.search_by_name(fragment).await?)
    }

    pub async fn products_by_kind(&self, kind: &str) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.products_by_kind(kind).await?)
    }

    pub async fn products_page(
        &self,
        query: ProductPageQuery,
    ) -> Result<ProductPage, ServiceError> {
        Ok(self.store.products_page(&query).await?)
    }
}
