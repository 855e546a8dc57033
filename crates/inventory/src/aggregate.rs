//! Folding an item's batches into its displayed quantity, status and next
//! expiry.
//!
//! The fold is pure: the same batch snapshot and `now` always produce the same
//! summary. Nothing here is stored; callers recompute whenever batches change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use larder_core::{BatchId, ValueObject, within_days};

use crate::InventoryBatch;
use crate::item::{InventoryItem, SummarizedItem};

/// Displayed state of an inventory item.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    #[default]
    Ok,
    Low,
    Expiring,
    Expired,
}

/// Derived fields of one inventory item.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    /// Sum of quantities over `Active` batches.
    pub total_quantity: f64,
    pub status: ItemStatus,
    /// Earliest expiry among `Active` batches that have one.
    pub next_expiry: Option<DateTime<Utc>>,
}

impl ValueObject for InventorySummary {}

impl InventorySummary {
    pub fn empty() -> Self {
        Self {
            total_quantity: 0.0,
            status: ItemStatus::Ok,
            next_expiry: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AggregationError {
    #[error("invalid batch {batch_id}: {reason}")]
    InvalidBatch { batch_id: BatchId, reason: String },

    #[error("invalid low-stock threshold: {0}")]
    InvalidThreshold(f64),
}

/// Fold `batches` into an [`InventorySummary`].
///
/// Status precedence, first match wins:
/// 1. `Expired`: an active batch expired strictly before `now`.
/// 2. `Low`: stock is positive, a threshold is set, and stock is below it.
/// 3. `Expiring`: the next expiry falls within `[now, now + expiring_window_days]`.
/// 4. `Ok`.
///
/// An empty (or fully consumed) inventory is `Ok` even under a threshold.
pub fn aggregate<'a, I>(
    batches: I,
    low_stock_threshold: Option<f64>,
    expiring_window_days: u32,
    now: DateTime<Utc>,
) -> Result<InventorySummary, AggregationError>
where
    I: IntoIterator<Item = &'a InventoryBatch>,
{
    if let Some(threshold) = low_stock_threshold {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(AggregationError::InvalidThreshold(threshold));
        }
    }

    let mut total_quantity = 0.0;
    let mut next_expiry: Option<DateTime<Utc>> = None;
    let mut any_expired = false;

    for batch in batches {
        if !batch.quantity.is_finite() || batch.quantity < 0.0 {
            return Err(AggregationError::InvalidBatch {
                batch_id: batch.id,
                reason: format!("quantity {} is not a non-negative number", batch.quantity),
            });
        }

        if !batch.status.is_active() {
            continue;
        }

        total_quantity += batch.quantity;

        if let Some(expiry) = batch.expiry_date {
            any_expired |= expiry < now;
            next_expiry = Some(match next_expiry {
                Some(current) => current.min(expiry),
                None => expiry,
            });
        }
    }

    let status = if any_expired {
        ItemStatus::Expired
    } else if total_quantity > 0.0
        && low_stock_threshold.is_some_and(|threshold| total_quantity < threshold)
    {
        ItemStatus::Low
    } else if next_expiry.is_some_and(|expiry| within_days(expiry, now, expiring_window_days)) {
        ItemStatus::Expiring
    } else {
        ItemStatus::Ok
    };

    Ok(InventorySummary {
        total_quantity,
        status,
        next_expiry,
    })
}

/// Aggregation settings applied to every item of a kitchen.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAggregator {
    /// Days ahead of `now` in which an expiry counts as "expiring".
    pub expiring_window_days: u32,
    /// Threshold used for items that do not set their own.
    pub default_low_stock_threshold: Option<f64>,
}

impl Default for InventoryAggregator {
    fn default() -> Self {
        Self {
            expiring_window_days: Self::DEFAULT_EXPIRING_WINDOW_DAYS,
            default_low_stock_threshold: None,
        }
    }
}

impl InventoryAggregator {
    pub const DEFAULT_EXPIRING_WINDOW_DAYS: u32 = 7;

    pub fn new(expiring_window_days: u32, default_low_stock_threshold: Option<f64>) -> Self {
        Self {
            expiring_window_days,
            default_low_stock_threshold,
        }
    }

    pub fn threshold_for(&self, item: &InventoryItem) -> Option<f64> {
        item.threshold().or(self.default_low_stock_threshold)
    }

    /// Summarize one item from its batches.
    ///
    /// Every batch must belong to `item`; a stray batch is rejected rather
    /// than silently counted.
    pub fn summarize(
        &self,
        item: &InventoryItem,
        batches: &[InventoryBatch],
        now: DateTime<Utc>,
    ) -> Result<SummarizedItem, AggregationError> {
        if let Some(stray) = batches.iter().find(|b| b.item_id != item.id()) {
            return Err(AggregationError::InvalidBatch {
                batch_id: stray.id,
                reason: format!("belongs to item {} not {}", stray.item_id, item.id()),
            });
        }

        let summary = aggregate(batches, self.threshold_for(item), self.expiring_window_days, now)?;
        tracing::trace!(
            item_id = %item.id(),
            total_quantity = summary.total_quantity,
            status = ?summary.status,
            "summarized inventory item"
        );

        Ok(SummarizedItem {
            item: item.clone(),
            summary,
            low_stock_threshold: self.threshold_for(item),
        })
    }
}
