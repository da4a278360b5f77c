//! Inventory Ledger domain module.
//!
//! The ledger is the single authority for stock levels and for the
//! append-only history that justifies every mutation. This crate contains the
//! deterministic domain logic only (no IO, no HTTP, no storage): status
//! arithmetic, operation-record construction with product-attribute
//! snapshots, the field diff for edits, and the query parameter types.
//!
//! Invariant: a product's `available_quantity` always equals the sum of the
//! `quantity_change` values over its operation history, plus any out-of-band
//! seed. Operations are immutable once written.

pub mod operation;
pub mod query;
pub mod status;

pub use operation::{InventoryOperation, NewOperation, OperationKind, change_description};
pub use query::{OperationPage, TimeRange};
pub use status::{DEFAULT_LOW_STOCK_THRESHOLD, InventoryStatus};
