//! Inventory domain module.
//!
//! Perishable stock is tracked as batches; everything shown for an item
//! (quantity, status, next expiry) is folded from its batches on read. Pure
//! domain logic without IO; callers pass `now`.

pub mod aggregate;
pub mod batch;
pub mod item;
pub mod usage;

pub use aggregate::{
    AggregationError, InventoryAggregator, InventorySummary, ItemStatus, aggregate,
};
pub use batch::{BatchRevision, BatchStatus, InventoryBatch, NewBatch};
pub use item::{
    InventoryItem, InventoryItemPatch, NewInventoryItem, StorageLocation, SummarizedItem,
};
pub use usage::{UsageError, UsageKind, UsageLog};
