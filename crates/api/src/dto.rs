//! Request/response DTOs and mapping to/from domain types.
//!
//! The wire format is camelCase JSON; the product type attribute travels as
//! `type` on the wire, so the Rust-side field is `kind` with a serde rename.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_catalog::{Product, ProductSort};
use labstock_ledger::{DEFAULT_LOW_STOCK_THRESHOLD, InventoryOperation, InventoryStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: String,
    pub material: String,
}

impl From<Product> for ProductDto {
    fn from(product: Product) -> Self {
        Self {
            id: product.id_typed().as_i64(),
            name: product.name().to_string(),
            kind: product.kind().to_string(),
            size: product.size().to_string(),
            material: product.material().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: String,
    pub material: String,
    #[serde(default)]
    pub initial_quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: String,
    pub material: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsPagedQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub sort_by: Option<ProductSort>,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedProductsResponse {
    pub products: Vec<ProductDto>,
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    pub product_id: i64,
    pub quantity_change: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDto {
    pub product_id: i64,
    pub available_quantity: i64,
}

impl From<InventoryStatus> for StatusDto {
    fn from(status: InventoryStatus) -> Self {
        Self {
            product_id: status.product_id.as_i64(),
            available_quantity: status.available_quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    #[serde(default = "default_threshold")]
    pub threshold: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDto {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub product_id: i64,
    pub product_name: String,
    pub product_type: String,
    pub size: String,
    pub material: String,
    pub quantity_change: i64,
    pub available_quantity: i64,
    pub operation_type: String,
    pub change_description: Option<String>,
}

impl From<InventoryOperation> for OperationDto {
    fn from(op: InventoryOperation) -> Self {
        Self {
            id: op.id.as_i64(),
            timestamp: op.occurred_at,
            product_id: op.product_id.as_i64(),
            product_name: op.snapshot.name().to_string(),
            product_type: op.snapshot.kind().to_string(),
            size: op.snapshot.size().to_string(),
            material: op.snapshot.material().to_string(),
            quantity_change: op.quantity_change,
            available_quantity: op.available_quantity,
            operation_type: op.kind.as_str().to_string(),
            change_description: op.change_description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsQuery {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedOperationsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedOperationsResponse {
    pub operations: Vec<OperationDto>,
    pub total_count: u64,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

fn default_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}
