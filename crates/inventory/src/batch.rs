use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{BatchId, DomainError, Entity, InventoryItemId};

/// Lifecycle state of a batch.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Stock on hand; the only status that counts towards quantity.
    #[default]
    Active,
    /// Fully consumed.
    Used,
    /// Past its expiry date.
    Expired,
    /// Thrown away.
    Wasted,
}

impl BatchStatus {
    pub fn is_active(self) -> bool {
        self == BatchStatus::Active
    }
}

/// A discrete quantity of an item received at one time.
///
/// Batches stay in the store after they stop being `Active` so usage history
/// remains intact; they simply stop contributing to totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryBatch {
    pub id: BatchId,
    pub item_id: InventoryItemId,
    pub quantity: f64,
    pub unit: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub purchase_price: Option<f64>,
    pub vendor: Option<String>,
    pub status: BatchStatus,
}

/// Input for receiving stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBatch {
    pub quantity: f64,
    pub unit: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub purchase_price: Option<f64>,
    pub vendor: Option<String>,
}

impl NewBatch {
    pub fn new(quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            quantity,
            unit: unit.into(),
            expiry_date: None,
            purchase_date: None,
            purchase_price: None,
            vendor: None,
        }
    }

    pub fn expiring_at(mut self, expiry_date: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    pub fn purchased(mut self, at: DateTime<Utc>, price: Option<f64>, vendor: Option<String>) -> Self {
        self.purchase_date = Some(at);
        self.purchase_price = price;
        self.vendor = vendor;
        self
    }
}

/// Correction to a batch's quantity or expiry. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRevision {
    pub quantity: Option<f64>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl InventoryBatch {
    /// Receive stock for `item_id`. New batches always start `Active`.
    pub fn receive(id: BatchId, item_id: InventoryItemId, input: NewBatch) -> Result<Self, DomainError> {
        if !input.quantity.is_finite() || input.quantity < 0.0 {
            return Err(DomainError::validation("batch quantity must be a non-negative number"));
        }
        if input.unit.trim().is_empty() {
            return Err(DomainError::validation("batch unit cannot be empty"));
        }
        if let Some(price) = input.purchase_price {
            if !price.is_finite() || price < 0.0 {
                return Err(DomainError::validation("purchase price must be a non-negative number"));
            }
        }

        Ok(Self {
            id,
            item_id,
            quantity: input.quantity,
            unit: input.unit,
            expiry_date: input.expiry_date,
            purchase_date: input.purchase_date,
            purchase_price: input.purchase_price,
            vendor: input.vendor,
            status: BatchStatus::Active,
        })
    }

    /// Correct a batch that is still on hand. Consumed or wasted batches are
    /// history and cannot be revised.
    pub fn revise(&mut self, revision: BatchRevision) -> Result<(), DomainError> {
        if matches!(self.status, BatchStatus::Used | BatchStatus::Wasted) {
            return Err(DomainError::invariant(format!(
                "batch {} is {:?} and can no longer be revised",
                self.id, self.status
            )));
        }
        if let Some(quantity) = revision.quantity {
            if !quantity.is_finite() || quantity < 0.0 {
                return Err(DomainError::validation("batch quantity must be a non-negative number"));
            }
            self.quantity = quantity;
        }
        if revision.expiry_date.is_some() {
            self.expiry_date = revision.expiry_date;
        }
        Ok(())
    }

    /// Whether an active batch's expiry date is strictly before `now`.
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active() && self.expiry_date.is_some_and(|expiry| expiry < now)
    }

    /// Status as of `now`: `Active` batches past expiry read as `Expired`
    /// whether or not that has been persisted yet.
    pub fn effective_status(&self, now: DateTime<Utc>) -> BatchStatus {
        if self.is_past_expiry(now) {
            BatchStatus::Expired
        } else {
            self.status
        }
    }

    /// Persist the expiry transition. Returns whether the status changed.
    pub fn mark_expired_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_past_expiry(now) {
            self.status = BatchStatus::Expired;
            true
        } else {
            false
        }
    }
}

impl Entity for InventoryBatch {
    type Id = BatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
