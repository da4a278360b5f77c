//! Infrastructure layer: persistence gateway and application services.
//!
//! The store seam (`InventoryStore`) abstracts the transactional backing
//! store; `InMemoryStore` serves tests/dev and `PgStore` is the Postgres
//! implementation. The services compose domain logic with a store the way a
//! request handler needs it: one atomic commit per mutation.

pub mod service;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use service::{CatalogService, LedgerService, ServiceError};
pub use store::{
    CommitReceipt, CommitUnit, InMemoryStore, InventoryStore, PgStore, ProductWrite, StatusWrite,
    StoreError,
};
