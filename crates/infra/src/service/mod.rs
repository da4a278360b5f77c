//! Application services: domain logic composed with a store.
//!
//! Each mutation builds its domain records first (status transition,
//! operation row with snapshot) and then hands the store one `CommitUnit`,
//! so either the whole mutation lands or none of it does. Failures map
//! 1:1 onto `ServiceError`; there is no partial-success reporting and no
//! internal retry.

mod catalog;
mod ledger;

use thiserror::Error;

use labstock_core::DomainError;

use crate::store::StoreError;

pub use catalog::CatalogService;
pub use ledger::LedgerService;

/// What a service call can fail with: a deterministic domain rejection, or
/// an infrastructure failure from the backing store.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
