//! Operation-log query parameters and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::operation::InventoryOperation;

/// Optional time window over operation timestamps.
///
/// Both bounds are inclusive; an omitted bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// No filtering at all.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if self.start.is_some_and(|start| at < start) {
            return false;
        }
        if self.end.is_some_and(|end| at > end) {
            return false;
        }
        true
    }
}

/// One page of the operation log, newest first, plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationPage {
    pub operations: Vec<InventoryOperation>,
    pub total_count: u64,
}
