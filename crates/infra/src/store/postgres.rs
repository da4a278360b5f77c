//! Postgres-backed store implementation.
//!
//! All mutations flow through `commit`, which wraps the product write, the
//! status write, and the operation append in a single SQL transaction, so a
//! mid-unit failure rolls everything back.
//!
//! ## Error mapping
//!
//! | sqlx error | StoreError | Scenario |
//! |------------|------------|----------|
//! | Database, code `23505` | `Constraint` | Duplicate key |
//! | Database, other codes | `Constraint` | Check or not-null rejections |
//! | PoolTimedOut / PoolClosed / Io | `Unavailable` | Store unreachable |
//! | ColumnDecode / Decode | `Decode` | Corrupt or unexpected row |
//! | anything else | `Unavailable` | Network errors, protocol failures |

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::instrument;

use labstock_catalog::{Product, ProductPage, ProductPageQuery, ProductSort, ProductSpec};
use labstock_core::{OperationId, Page, ProductId};
use labstock_ledger::{
    InventoryOperation, InventoryStatus, OperationKind, OperationPage, TimeRange,
};

use super::r#trait::{
    CommitReceipt, CommitUnit, InventoryStore, ProductWrite, StatusWrite, StoreError,
};

/// Postgres-backed transactional store.
///
/// Uses a sqlx connection pool (thread-safe, `Send + Sync`); every commit
/// unit runs inside one transaction.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("connect: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migrate: {e}")))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests, shared pools).
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx_error(op: &str, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) => StoreError::Constraint(format!("{op}: {db}")),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{op}: {e}"))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Decode(format!("{op}: {e}"))
        }
        _ => StoreError::Unavailable(format!("{op}: {e}")),
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let id: i64 = row
        .try_get("id")
        .map_err(|e| StoreError::Decode(format!("products.id: {e}")))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| StoreError::Decode(format!("products.name: {e}")))?;
    let kind: String = row
        .try_get("kind")
        .map_err(|e| StoreError::Decode(format!("products.kind: {e}")))?;
    let size: String = row
        .try_get("size")
        .map_err(|e| StoreError::Decode(format!("products.size: {e}")))?;
    let material: String = row
        .try_get("material")
        .map_err(|e| StoreError::Decode(format!("products.material: {e}")))?;

    let spec = ProductSpec::new(name, kind, size, material)
        .map_err(|e| StoreError::Decode(format!("products row {id}: {e}")))?;
    Ok(Product::new(ProductId::new(id), spec))
}

fn status_from_row(row: &PgRow) -> Result<InventoryStatus, StoreError> {
    let product_id: i64 = row
        .try_get("product_id")
        .map_err(|e| StoreError::Decode(format!("inventory_status.product_id: {e}")))?;
    let available_quantity: i64 = row
        .try_get("available_quantity")
        .map_err(|e| StoreError::Decode(format!("inventory_status.available_quantity: {e}")))?;
    Ok(InventoryStatus::new(
        ProductId::new(product_id),
        available_quantity,
    ))
}

fn operation_from_row(row: &PgRow) -> Result<InventoryOperation, StoreError> {
    let decode = |field: &str, e: sqlx::Error| {
        StoreError::Decode(format!("inventory_operations.{field}: {e}"))
    };

    let id: i64 = row.try_get("id").map_err(|e| decode("id", e))?;
    let occurred_at = row
        .try_get("occurred_at")
        .map_err(|e| decode("occurred_at", e))?;
    let product_id: i64 = row
        .try_get("product_id")
        .map_err(|e| decode("product_id", e))?;
    let product_name: String = row
        .try_get("product_name")
        .map_err(|e| decode("product_name", e))?;
    let product_kind: String = row
        .try_get("product_kind")
        .map_err(|e| decode("product_kind", e))?;
    let size: String = row.try_get("size").map_err(|e| decode("size", e))?;
    let material: String = row.try_get("material").map_err(|e| decode("material", e))?;
    let quantity_change: i64 = row
        .try_get("quantity_change")
        .map_err(|e| decode("quantity_change", e))?;
    let available_quantity: i64 = row
        .try_get("available_quantity")
        .map_err(|e| decode("available_quantity", e))?;
    let operation_type: String = row
        .try_get("operation_type")
        .map_err(|e| decode("operation_type", e))?;
    let change_description: Option<String> = row
        .try_get("change_description")
        .map_err(|e| decode("change_description", e))?;

    let kind = OperationKind::parse(&operation_type).ok_or_else(|| {
        StoreError::Decode(format!(
            "inventory_operations row {id}: unknown operation_type '{operation_type}'"
        ))
    })?;
    let snapshot = ProductSpec::new(product_name, product_kind, size, material)
        .map_err(|e| StoreError::Decode(format!("inventory_operations row {id}: {e}")))?;

    Ok(InventoryOperation {
        id: OperationId::new(id),
        occurred_at,
        product_id: ProductId::new(product_id),
        snapshot,
        quantity_change,
        available_quantity,
        kind,
        change_description,
    })
}

const OPERATION_COLUMNS: &str = "id, occurred_at, product_id, product_name, product_kind, \
     size, material, quantity_change, available_quantity, operation_type, change_description";

async fn upsert_product(
    tx: &mut Transaction<'_, Postgres>,
    product: &Product,
    insert: bool,
) -> Result<(), StoreError> {
    if insert {
        sqlx::query(
            "INSERT INTO products (id, name, kind, size, material) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(product.id_typed().as_i64())
        .bind(product.name())
        .bind(product.kind())
        .bind(product.size())
        .bind(product.material())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
    } else {
        let result =
            sqlx::query("UPDATE products SET name = $2, kind = $3, size = $4, material = $5 WHERE id = $1")
                .bind(product.id_typed().as_i64())
                .bind(product.name())
                .bind(product.kind())
                .bind(product.size())
                .bind(product.material())
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("update_product", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::InvalidCommit(format!(
                "update of missing product {}",
                product.id_typed()
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl InventoryStore for PgStore {
    #[instrument(skip(self), err)]
    async fn next_product_id(&self) -> Result<ProductId, StoreError> {
        let row = sqlx::query("SELECT nextval('products_id_seq') AS id")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("next_product_id", e))?;
        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::Decode(format!("nextval: {e}")))?;
        Ok(ProductId::new(id))
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT id, name, kind, size, material FROM products WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT id, name, kind, size, material FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    async fn contains_spec(&self, spec: &ProductSpec) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS(
                SELECT 1 FROM products
                WHERE name = $1 AND kind = $2 AND size = $3 AND material = $4
            ) AS found",
        )
        .bind(spec.name())
        .bind(spec.kind())
        .bind(spec.size())
        .bind(spec.material())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("contains_spec", e))?;
        row.try_get("found")
            .map_err(|e| StoreError::Decode(format!("contains_spec: {e}")))
    }

    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, kind, size, material FROM products
             WHERE name LIKE '%' || $1 || '%' ORDER BY id",
        )
        .bind(fragment)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_by_name", e))?;
        rows.iter().map(product_from_row).collect()
    }

    async fn products_by_kind(&self, kind: &str) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, kind, size, material FROM products WHERE kind = $1 ORDER BY id",
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products_by_kind", e))?;
        rows.iter().map(product_from_row).collect()
    }

    async fn products_page(&self, query: &ProductPageQuery) -> Result<ProductPage, StoreError> {
        // Sort column comes from a closed enum, never from request text.
        let column = match query.sort_by {
            Some(ProductSort::Name) => "name",
            Some(ProductSort::Kind) => "kind",
            None => "id",
        };
        let direction = if query.descending { "DESC" } else { "ASC" };

        let count_row = sqlx::query("SELECT COUNT(*) AS total FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("products_page_count", e))?;
        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| StoreError::Decode(format!("products_page count: {e}")))?;

        let sql = format!(
            "SELECT id, name, kind, size, material FROM products
             ORDER BY {column} {direction}, id ASC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query(&sql)
            .bind(query.page.limit() as i64)
            .bind(query.page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("products_page", e))?;

        Ok(ProductPage {
            products: rows.iter().map(product_from_row).collect::<Result<_, _>>()?,
            total_count: total as u64,
        })
    }

    async fn status(&self, id: ProductId) -> Result<Option<InventoryStatus>, StoreError> {
        let row = sqlx::query(
            "SELECT product_id, available_quantity FROM inventory_status WHERE product_id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("status", e))?;
        row.as_ref().map(status_from_row).transpose()
    }

    async fn statuses(&self) -> Result<Vec<InventoryStatus>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, available_quantity FROM inventory_status ORDER BY product_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("statuses", e))?;
        rows.iter().map(status_from_row).collect()
    }

    async fn low_stock(&self, threshold: i64) -> Result<Vec<InventoryStatus>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, available_quantity FROM inventory_status
             WHERE available_quantity < $1 ORDER BY product_id",
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("low_stock", e))?;
        rows.iter().map(status_from_row).collect()
    }

    async fn operations(&self, range: &TimeRange) -> Result<Vec<InventoryOperation>, StoreError> {
        let sql = format!(
            "SELECT {OPERATION_COLUMNS} FROM inventory_operations
             WHERE ($1::timestamptz IS NULL OR occurred_at >= $1)
               AND ($2::timestamptz IS NULL OR occurred_at <= $2)
             ORDER BY occurred_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("operations", e))?;
        rows.iter().map(operation_from_row).collect()
    }

    async fn operations_page(
        &self,
        page: Page,
        range: &TimeRange,
    ) -> Result<OperationPage, StoreError> {
        let count_row = sqlx::query(
            "SELECT COUNT(*) AS total FROM inventory_operations
             WHERE ($1::timestamptz IS NULL OR occurred_at >= $1)
               AND ($2::timestamptz IS NULL OR occurred_at <= $2)",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("operations_page_count", e))?;
        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| StoreError::Decode(format!("operations_page count: {e}")))?;

        let sql = format!(
            "SELECT {OPERATION_COLUMNS} FROM inventory_operations
             WHERE ($1::timestamptz IS NULL OR occurred_at >= $1)
               AND ($2::timestamptz IS NULL OR occurred_at <= $2)
             ORDER BY occurred_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&sql)
            .bind(range.start)
            .bind(range.end)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("operations_page", e))?;

        Ok(OperationPage {
            operations: rows
                .iter()
                .map(operation_from_row)
                .collect::<Result<_, _>>()?,
            total_count: total as u64,
        })
    }

    #[instrument(skip(self, unit), err)]
    async fn commit(&self, unit: CommitUnit) -> Result<CommitReceipt, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        match &unit.product {
            Some(ProductWrite::Insert(product)) => upsert_product(&mut tx, product, true).await?,
            Some(ProductWrite::Update(product)) => upsert_product(&mut tx, product, false).await?,
            Some(ProductWrite::Remove(id)) => {
                let result = sqlx::query("DELETE FROM products WHERE id = $1")
                    .bind(id.as_i64())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("remove_product", e))?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::InvalidCommit(format!(
                        "removal of missing product {id}"
                    )));
                }
            }
            None => {}
        }

        match &unit.status {
            Some(StatusWrite::Upsert(status)) => {
                sqlx::query(
                    "INSERT INTO inventory_status (product_id, available_quantity)
                     VALUES ($1, $2)
                     ON CONFLICT (product_id)
                     DO UPDATE SET available_quantity = EXCLUDED.available_quantity",
                )
                .bind(status.product_id.as_i64())
                .bind(status.available_quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("upsert_status", e))?;
            }
            Some(StatusWrite::Remove(id)) => {
                sqlx::query("DELETE FROM inventory_status WHERE product_id = $1")
                    .bind(id.as_i64())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("remove_status", e))?;
            }
            None => {}
        }

        let operation = match unit.operation {
            Some(op) => {
                let row = sqlx::query(
                    "INSERT INTO inventory_operations
                        (occurred_at, product_id, product_name, product_kind, size, material,
                         quantity_change, available_quantity, operation_type, change_description)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                     RETURNING id",
                )
                .bind(op.occurred_at)
                .bind(op.product_id.as_i64())
                .bind(op.snapshot.name())
                .bind(op.snapshot.kind())
                .bind(op.snapshot.size())
                .bind(op.snapshot.material())
                .bind(op.quantity_change)
                .bind(op.available_quantity)
                .bind(op.kind.as_str())
                .bind(op.change_description.as_deref())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("append_operation", e))?;
                let id: i64 = row
                    .try_get("id")
                    .map_err(|e| StoreError::Decode(format!("append_operation: {e}")))?;
                Some(InventoryOperation::committed(OperationId::new(id), op))
            }
            None => None,
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(CommitReceipt { operation })
    }
}
