//! `larder-scan`
//!
//! **Responsibility:** typed results of image scans (inventory photos,
//! receipts, dishes).
//!
//! The vision model call itself lives elsewhere; this crate only turns what
//! came back into a tagged result per scan kind, with explicit fallbacks when
//! the output is not usable. It never mutates inventory.

pub mod kind;
pub mod result;

pub use kind::{ScanError, ScanKind};
pub use result::{ReceiptLine, ReceiptScan, RecipeScan, ScanResult, ScannedItem};
