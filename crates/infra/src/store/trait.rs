use async_trait::async_trait;
use thiserror::Error;

use labstock_catalog::{Product, ProductPage, ProductPageQuery, ProductSpec};
use labstock_core::{Page, ProductId};
use labstock_ledger::{
    InventoryOperation, InventoryStatus, NewOperation, OperationPage, TimeRange,
};

/// Store operation error.
///
/// These are **infrastructure errors** (connectivity, constraints, row
/// decoding) as opposed to domain errors (validation, not-found). They are
/// propagated to the caller unmodified; the store never retries internally,
/// since a blindly retried adjustment would double-apply its delta.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or the commit did not complete.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A storage constraint rejected the write (e.g. duplicate key).
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A persisted row could not be decoded into its domain type.
    #[error("row decode failed: {0}")]
    Decode(String),

    /// The commit unit referenced state the store does not have.
    #[error("invalid commit: {0}")]
    InvalidCommit(String),
}

/// Product-table half of a commit unit.
#[derive(Debug, Clone)]
pub enum ProductWrite {
    Insert(Product),
    Update(Product),
    Remove(ProductId),
}

/// Status-table half of a commit unit.
#[derive(Debug, Clone)]
pub enum StatusWrite {
    Upsert(InventoryStatus),
    Remove(ProductId),
}

/// One atomic unit of work against the store.
///
/// Holds at most one product write, one status write, and one operation
/// append. Implementations must apply **all of it or none of it**: a status
/// update without its operation row (or vice versa) is the one failure mode
/// this design exists to prevent.
#[derive(Debug, Clone, Default)]
pub struct CommitUnit {
    pub product: Option<ProductWrite>,
    pub status: Option<StatusWrite>,
    pub operation: Option<NewOperation>,
}

impl CommitUnit {
    /// Stock adjustment: status upsert + its operation row.
    pub fn adjustment(status: InventoryStatus, operation: NewOperation) -> Self {
        Self {
            product: None,
            status: Some(StatusWrite::Upsert(status)),
            operation: Some(operation),
        }
    }

    /// New product: product insert + opening status + `ProductAdded` row.
    pub fn product_created(
        product: Product,
        status: InventoryStatus,
        operation: NewOperation,
    ) -> Self {
        Self {
            product: Some(ProductWrite::Insert(product)),
            status: Some(StatusWrite::Upsert(status)),
            operation: Some(operation),
        }
    }

    /// Attribute edit: product update + `ProductUpdated` row. Status untouched.
    pub fn product_updated(product: Product, operation: NewOperation) -> Self {
        Self {
            product: Some(ProductWrite::Update(product)),
            status: None,
            operation: Some(operation),
        }
    }

    /// Deletion: product + status rows removed, `ProductDeleted` row appended.
    pub fn product_deleted(product_id: ProductId, operation: NewOperation) -> Self {
        Self {
            product: Some(ProductWrite::Remove(product_id)),
            status: Some(StatusWrite::Remove(product_id)),
            operation: Some(operation),
        }
    }
}

/// What a successful commit produced.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    /// The appended operation with its store-assigned id, if the unit had one.
    pub operation: Option<InventoryOperation>,
}

/// Transactional store for products, status rows, and the operation log.
///
/// ## Implementation requirements
///
/// - `commit` is atomic: every write in the unit is applied, or none is.
/// - Operation ids are assigned at commit time, monotonically, never reused.
/// - Operation reads return newest first (`occurred_at` descending, id
///   descending as the tiebreak).
/// - Reads take no locks beyond the store's own and may run concurrently
///   with writes; a reader may observe the status row slightly before or
///   after its operation row depending on isolation level.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Allocate the next product id. Allocation is not transactional: an id
    /// handed out for a commit that later fails is simply skipped.
    async fn next_product_id(&self) -> Result<ProductId, StoreError>;

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn products(&self) -> Result<Vec<Product>, StoreError>;

    /// Whether a product with exactly these attributes already exists.
    async fn contains_spec(&self, spec: &ProductSpec) -> Result<bool, StoreError>;

    /// Products whose name contains `fragment`.
    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, StoreError>;

    /// Products whose type attribute equals `kind` exactly.
    async fn products_by_kind(&self, kind: &str) -> Result<Vec<Product>, StoreError>;

    async fn products_page(&self, query: &ProductPageQuery) -> Result<ProductPage, StoreError>;

    async fn status(&self, id: ProductId) -> Result<Option<InventoryStatus>, StoreError>;

    async fn statuses(&self) -> Result<Vec<InventoryStatus>, StoreError>;

    /// Status rows strictly below `threshold`.
    async fn low_stock(&self, threshold: i64) -> Result<Vec<InventoryStatus>, StoreError>;

    /// Operation log, newest first, filtered to `range` (inclusive bounds).
    async fn operations(&self, range: &TimeRange) -> Result<Vec<InventoryOperation>, StoreError>;

    async fn operations_page(
        &self,
        page: Page,
        range: &TimeRange,
    ) -> Result<OperationPage, StoreError>;

    /// Apply one atomic unit of work.
    async fn commit(&self, unit: CommitUnit) -> Result<CommitReceipt, StoreError>;
}
