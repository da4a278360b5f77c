//! Catalog listing queries (paging + sorting).

use serde::{Deserialize, Serialize};

use labstock_core::Page;

use crate::product::Product;

/// Sortable product columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSort {
    Name,
    /// Sorts on the product type attribute.
    #[serde(rename = "type")]
    Kind,
}

/// Paged product listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPageQuery {
    pub page: Page,
    pub sort_by: Option<ProductSort>,
    pub descending: bool,
}

impl Default for ProductPageQuery {
    fn default() -> Self {
        Self {
            page: Page::default(),
            sort_by: None,
            descending: false,
        }
    }
}

/// One page of products plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total_count: u64,
}
