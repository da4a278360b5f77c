use serde::{Deserialize, Serialize};

use labstock_core::ProductId;

/// Low-stock threshold used when the caller does not supply one.
///
/// Exposed as a documented default rather than buried in query logic; the
/// HTTP surface applies it to `lowstock` requests with no `threshold`.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 50;

/// Current quantity-on-hand record for one product.
///
/// One row per product, created lazily on the first adjustment (or on product
/// creation) and removed when the product is deleted. The quantity may go
/// negative: no floor is enforced, so oversold stock shows up as a negative
/// balance instead of a rejected adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStatus {
    pub product_id: ProductId,
    pub available_quantity: i64,
}

impl InventoryStatus {
    pub fn new(product_id: ProductId, available_quantity: i64) -> Self {
        Self {
            product_id,
            available_quantity,
        }
    }

    /// Status row for a product that has never been adjusted.
    pub fn empty(product_id: ProductId) -> Self {
        Self::new(product_id, 0)
    }

    /// Pure transition: the status after applying `delta`.
    pub fn with_delta(self, delta: i64) -> Self {
        Self {
            product_id: self.product_id,
            available_quantity: self.available_quantity + delta,
        }
    }

    /// Strictly below `threshold`.
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.available_quantity < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_application_is_additive() {
        let status = InventoryStatus::empty(ProductId::new(1))
            .with_delta(100)
            .with_delta(-30);
        assert_eq!(status.available_quantity, 70);
    }

    #[test]
    fn quantity_may_go_negative() {
        let status = InventoryStatus::empty(ProductId::new(1)).with_delta(-5);
        assert_eq!(status.available_quantity, -5);
    }

    #[test]
    fn low_stock_is_a_strict_inequality() {
        let status = InventoryStatus::new(ProductId::new(1), 70);
        assert!(status.is_low_stock(75));
        assert!(!status.is_low_stock(70));
        assert!(!status.is_low_stock(50));
    }
}
