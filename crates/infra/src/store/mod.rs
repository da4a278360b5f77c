//! Persistence gateway for the catalog and the inventory ledger.

mod in_memory;
mod postgres;
mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PgStore;
pub use r#trait::{
    CommitReceipt, CommitUnit, InventoryStore, ProductWrite, StatusWrite, StoreError,
};
