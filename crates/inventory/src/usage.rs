//! Usage logs and the batch transitions they drive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use larder_core::{BatchId, InventoryItemId};

use crate::{BatchStatus, InventoryBatch};

/// Quantities closer to zero than this are treated as exhausted.
const QUANTITY_EPSILON: f64 = 1e-9;

/// What happened to some stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageKind {
    Cooked,
    Consumed,
    Wasted,
    Purchased,
    Adjusted,
}

/// One recorded action against a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLog {
    pub item_id: InventoryItemId,
    pub batch_id: BatchId,
    pub kind: UsageKind,
    pub quantity: f64,
    pub unit: String,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UsageError {
    #[error("batch is {0:?}; only active batches accept usage")]
    InactiveBatch(BatchStatus),

    #[error("batch has expired; only waste or a recount can be recorded")]
    ExpiredBatch,

    #[error("usage quantity must be a non-negative number (got {0})")]
    InvalidQuantity(f64),

    #[error("adding {added} to {current} is out of range")]
    QuantityOverflow { current: f64, added: f64 },

    #[error("requested {requested} but only {available} available")]
    ExceedsAvailable { requested: f64, available: f64 },
}

impl InventoryBatch {
    /// Apply a usage action and return its log entry.
    ///
    /// - `Cooked`/`Consumed` draw down; an emptied batch becomes `Used`.
    /// - `Wasted` draws down; an emptied batch becomes `Wasted`.
    /// - `Purchased` tops up.
    /// - `Adjusted` sets the quantity outright (a recount); zero marks `Used`.
    ///
    /// A batch past its expiry at `at` (persisted or not) only accepts
    /// `Wasted` and `Adjusted`. The batch is left untouched on error.
    pub fn record_usage(
        &mut self,
        kind: UsageKind,
        quantity: f64,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<UsageLog, UsageError> {
        match self.effective_status(at) {
            BatchStatus::Active => {}
            BatchStatus::Expired => {
                if !matches!(kind, UsageKind::Wasted | UsageKind::Adjusted) {
                    return Err(UsageError::ExpiredBatch);
                }
            }
            status => return Err(UsageError::InactiveBatch(status)),
        }
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(UsageError::InvalidQuantity(quantity));
        }

        match kind {
            UsageKind::Cooked | UsageKind::Consumed | UsageKind::Wasted => {
                if quantity > self.quantity + QUANTITY_EPSILON {
                    return Err(UsageError::ExceedsAvailable {
                        requested: quantity,
                        available: self.quantity,
                    });
                }
                let remaining = self.quantity - quantity;
                if remaining < QUANTITY_EPSILON {
                    self.quantity = 0.0;
                    self.status = if kind == UsageKind::Wasted {
                        BatchStatus::Wasted
                    } else {
                        BatchStatus::Used
                    };
                } else {
                    self.quantity = remaining;
                }
            }
            UsageKind::Purchased => {
                let topped_up = self.quantity + quantity;
                if !topped_up.is_finite() {
                    return Err(UsageError::QuantityOverflow {
                        current: self.quantity,
                        added: quantity,
                    });
                }
                self.quantity = topped_up;
            }
            UsageKind::Adjusted => {
                if quantity < QUANTITY_EPSILON {
                    self.quantity = 0.0;
                    self.status = BatchStatus::Used;
                } else {
                    self.quantity = quantity;
                }
            }
        }

        Ok(UsageLog {
            item_id: self.item_id,
            batch_id: self.id,
            kind,
            quantity,
            unit: self.unit.clone(),
            notes,
            date: at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::NewBatch;

    fn active(quantity: f64) -> InventoryBatch {
        InventoryBatch::receive(BatchId::new(), InventoryItemId::new(), NewBatch::new(quantity, "g"))
            .unwrap()
    }

    #[test]
    fn consuming_part_keeps_batch_active() {
        let mut batch = active(500.0);
        let log = batch
            .record_usage(UsageKind::Cooked, 200.0, Some("dal".to_string()), Utc::now())
            .unwrap();

        assert_eq!(batch.quantity, 300.0);
        assert_eq!(batch.status, BatchStatus::Active);
        assert_eq!(log.kind, UsageKind::Cooked);
        assert_eq!(log.unit, "g");
        assert_eq!(log.batch_id, batch.id);
    }

    #[test]
    fn consuming_everything_marks_used() {
        let mut batch = active(0.3);
        batch.record_usage(UsageKind::Consumed, 0.1, None, Utc::now()).unwrap();
        batch.record_usage(UsageKind::Consumed, 0.2, None, Utc::now()).unwrap();

        assert_eq!(batch.status, BatchStatus::Used);
        assert_eq!(batch.quantity, 0.0);
    }

    #[test]
    fn wasting_everything_marks_wasted() {
        let mut batch = active(2.0);
        batch.record_usage(UsageKind::Wasted, 2.0, None, Utc::now()).unwrap();
        assert_eq!(batch.status, BatchStatus::Wasted);
    }

    #[test]
    fn over_consumption_leaves_batch_untouched() {
        let mut batch = active(1.0);
        let err = batch.record_usage(UsageKind::Cooked, 1.5, None, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            UsageError::ExceedsAvailable {
                requested: 1.5,
                available: 1.0
            }
        );
        assert_eq!(batch.quantity, 1.0);
        assert_eq!(batch.status, BatchStatus::Active);
    }

    #[test]
    fn purchase_and_adjust_change_quantity() {
        let mut batch = active(1.0);
        batch.record_usage(UsageKind::Purchased, 2.0, None, Utc::now()).unwrap();
        assert_eq!(batch.quantity, 3.0);

        batch.record_usage(UsageKind::Adjusted, 1.25, None, Utc::now()).unwrap();
        assert_eq!(batch.quantity, 1.25);

        batch.record_usage(UsageKind::Adjusted, 0.0, None, Utc::now()).unwrap();
        assert_eq!(batch.status, BatchStatus::Used);
    }

    #[test]
    fn inactive_batches_reject_usage() {
        let mut batch = active(1.0);
        batch.status = BatchStatus::Used;
        let err = batch.record_usage(UsageKind::Consumed, 0.5, None, Utc::now()).unwrap_err();
        assert_eq!(err, UsageError::InactiveBatch(BatchStatus::Used));
    }

    #[test]
    fn past_expiry_batches_only_accept_waste_and_recount() {
        let now = Utc::now();
        let mut batch = InventoryBatch::receive(
            BatchId::new(),
            InventoryItemId::new(),
            NewBatch::new(4.0, "pcs").expiring_at(now - Duration::days(1)),
        )
        .unwrap();
        assert_eq!(batch.status, BatchStatus::Active);

        for kind in [UsageKind::Cooked, UsageKind::Consumed, UsageKind::Purchased] {
            assert_eq!(batch.record_usage(kind, 1.0, None, now), Err(UsageError::ExpiredBatch));
        }
        assert_eq!(batch.quantity, 4.0);

        batch.record_usage(UsageKind::Adjusted, 3.0, None, now).unwrap();
        batch.record_usage(UsageKind::Wasted, 3.0, None, now).unwrap();
        assert_eq!(batch.status, BatchStatus::Wasted);
    }

    #[test]
    fn persisted_expiry_still_accepts_waste() {
        let mut batch = active(2.0);
        batch.status = BatchStatus::Expired;
        assert_eq!(
            batch.record_usage(UsageKind::Consumed, 0.5, None, Utc::now()),
            Err(UsageError::ExpiredBatch)
        );
        batch.record_usage(UsageKind::Wasted, 2.0, None, Utc::now()).unwrap();
        assert_eq!(batch.status, BatchStatus::Wasted);
    }

    #[test]
    fn top_up_that_overflows_is_rejected() {
        let mut batch = active(1.0);
        batch.record_usage(UsageKind::Purchased, 1e308, None, Utc::now()).unwrap();
        let err = batch.record_usage(UsageKind::Purchased, 1e308, None, Utc::now()).unwrap_err();
        assert!(matches!(err, UsageError::QuantityOverflow { .. }));
        assert!(batch.quantity.is_finite());

        let summary = crate::aggregate(std::slice::from_ref(&batch), None, 7, Utc::now()).unwrap();
        assert!(summary.total_quantity.is_finite());
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let mut batch = active(1.0);
        let err = batch.record_usage(UsageKind::Purchased, -1.0, None, Utc::now()).unwrap_err();
        assert_eq!(err, UsageError::InvalidQuantity(-1.0));
    }
}
