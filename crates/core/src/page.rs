//! Offset paging parameters shared by catalog and ledger queries.

use serde::{Deserialize, Serialize};

/// 1-based page window.
///
/// `page = 0` is treated as page 1. `page_size` is deliberately uncapped:
/// the callers of this API control their own result sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

impl Page {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// 0-based row offset of the first row in this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}
