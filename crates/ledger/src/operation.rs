use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_catalog::{Product, ProductSpec};
use labstock_core::{OperationId, ProductId};

/// What a single audit-trail row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    StockChange,
    ProductAdded,
    ProductUpdated,
    ProductDeleted,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::StockChange => "StockChange",
            OperationKind::ProductAdded => "ProductAdded",
            OperationKind::ProductUpdated => "ProductUpdated",
            OperationKind::ProductDeleted => "ProductDeleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "StockChange" => Some(OperationKind::StockChange),
            "ProductAdded" => Some(OperationKind::ProductAdded),
            "ProductUpdated" => Some(OperationKind::ProductUpdated),
            "ProductDeleted" => Some(OperationKind::ProductDeleted),
            _ => None,
        }
    }
}

/// An operation ready to be appended to the ledger (not yet assigned an id).
///
/// The store assigns the monotonic id during commit; everything else,
/// including the product-attribute snapshot, is fixed at construction time.
/// The snapshot is a value copy, never a reference: history rows stay
/// meaningful after the product is renamed or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOperation {
    pub occurred_at: DateTime<Utc>,
    pub product_id: ProductId,
    pub snapshot: ProductSpec,
    pub quantity_change: i64,
    /// Balance after this operation was applied.
    pub available_quantity: i64,
    pub kind: OperationKind,
    pub change_description: Option<String>,
}

impl NewOperation {
    /// Quantity adjustment against an existing product.
    pub fn stock_change(
        product: &Product,
        delta: i64,
        available_quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            occurred_at,
            product_id: product.id_typed(),
            snapshot: product.spec().clone(),
            quantity_change: delta,
            available_quantity,
            kind: OperationKind::StockChange,
            change_description: None,
        }
    }

    /// First row in a product's history, carrying its opening balance.
    pub fn product_added(
        product: &Product,
        initial_quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            occurred_at,
            product_id: product.id_typed(),
            snapshot: product.spec().clone(),
            quantity_change: initial_quantity,
            available_quantity: initial_quantity,
            kind: OperationKind::ProductAdded,
            change_description: None,
        }
    }

    /// Attribute edit. Quantity is untouched; the description lists exactly
    /// the fields that changed, old value first.
    pub fn product_updated(
        old: &Product,
        new: &Product,
        available_quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            occurred_at,
            product_id: new.id_typed(),
            snapshot: new.spec().clone(),
            quantity_change: 0,
            available_quantity,
            kind: OperationKind::ProductUpdated,
            change_description: change_description(old.spec(), new.spec()),
        }
    }

    /// Final row in a product's history: the attribute values and balance as
    /// they stood at deletion time.
    pub fn product_deleted(
        product: &Product,
        last_quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            occurred_at,
            product_id: product.id_typed(),
            snapshot: product.spec().clone(),
            quantity_change: 0,
            available_quantity: last_quantity,
            kind: OperationKind::ProductDeleted,
            change_description: None,
        }
    }
}

/// A committed, immutable audit-trail row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryOperation {
    pub id: OperationId,
    pub occurred_at: DateTime<Utc>,
    pub product_id: ProductId,
    pub snapshot: ProductSpec,
    pub quantity_change: i64,
    pub available_quantity: i64,
    pub kind: OperationKind,
    pub change_description: Option<String>,
}

impl InventoryOperation {
    /// Seal an uncommitted operation with its store-assigned id.
    pub fn committed(id: OperationId, op: NewOperation) -> Self {
        Self {
            id,
            occurred_at: op.occurred_at,
            product_id: op.product_id,
            snapshot: op.snapshot,
            quantity_change: op.quantity_change,
            available_quantity: op.available_quantity,
            kind: op.kind,
            change_description: op.change_description,
        }
    }
}

/// Field-level diff between two attribute snapshots.
///
/// Returns a "; "-joined list of `Field: old -> new` entries covering only
/// the fields that changed, in the fixed order name, type, size, material.
/// `None` when the specs are identical.
pub fn change_description(old: &ProductSpec, new: &ProductSpec) -> Option<String> {
    let fields = [
        ("Name", old.name(), new.name()),
        ("Type", old.kind(), new.kind()),
        ("Size", old.size(), new.size()),
        ("Material", old.material(), new.material()),
    ];

    let changes: Vec<String> = fields
        .iter()
        .filter(|(_, before, after)| before != after)
        .map(|(label, before, after)| format!("{label}: {before} -> {after}"))
        .collect();

    if changes.is_empty() {
        None
    } else {
        Some(changes.join("; "))
    }
}
