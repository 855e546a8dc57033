use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{DomainError, Entity, InventoryItemId, KitchenId, within_days};

use crate::{InventorySummary, ItemStatus};

/// Where an item is kept.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageLocation {
    #[default]
    Pantry,
    Fridge,
    Freezer,
    Container,
    Cabinet,
}

/// Input for creating an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryItem {
    pub name: String,
    pub category: String,
    pub default_unit: String,
    pub threshold: Option<f64>,
    pub brand: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub location: StorageLocation,
}

/// Partial update of an item. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub default_unit: Option<String>,
    pub threshold: Option<f64>,
    pub brand: Option<String>,
    pub tags: Option<Vec<String>>,
    pub location: Option<StorageLocation>,
}

/// A kind of thing kept in a kitchen. Quantities live on its batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    id: InventoryItemId,
    kitchen_id: KitchenId,
    name: String,
    category: String,
    default_unit: String,
    threshold: Option<f64>,
    brand: Option<String>,
    tags: Vec<String>,
    location: StorageLocation,
}

impl InventoryItem {
    pub fn new(
        id: InventoryItemId,
        kitchen_id: KitchenId,
        input: NewInventoryItem,
    ) -> Result<Self, DomainError> {
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if input.default_unit.trim().is_empty() {
            return Err(DomainError::validation("default unit cannot be empty"));
        }
        validate_threshold(input.threshold)?;

        Ok(Self {
            id,
            kitchen_id,
            name: input.name,
            category: input.category,
            default_unit: input.default_unit,
            threshold: input.threshold,
            brand: input.brand,
            tags: input.tags,
            location: input.location,
        })
    }

    pub fn id(&self) -> InventoryItemId {
        self.id
    }

    pub fn kitchen_id(&self) -> KitchenId {
        self.kitchen_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn default_unit(&self) -> &str {
        &self.default_unit
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn location(&self) -> StorageLocation {
        self.location
    }

    pub fn set_threshold(&mut self, threshold: Option<f64>) -> Result<(), DomainError> {
        validate_threshold(threshold)?;
        self.threshold = threshold;
        Ok(())
    }

    pub fn move_to(&mut self, location: StorageLocation) {
        self.location = location;
    }

    /// Apply every field of `patch`, or none of them if any is invalid.
    pub fn apply(&mut self, patch: InventoryItemPatch) -> Result<(), DomainError> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if patch.default_unit.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(DomainError::validation("default unit cannot be empty"));
        }
        validate_threshold(patch.threshold)?;

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(unit) = patch.default_unit {
            self.default_unit = unit;
        }
        if patch.threshold.is_some() {
            self.threshold = patch.threshold;
        }
        if patch.brand.is_some() {
            self.brand = patch.brand;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        Ok(())
    }
}

fn validate_threshold(threshold: Option<f64>) -> Result<(), DomainError> {
    match threshold {
        Some(t) if !t.is_finite() || t < 0.0 => {
            Err(DomainError::validation("threshold must be a non-negative number"))
        }
        _ => Ok(()),
    }
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// An item together with its derived fields, as surfaced by read operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizedItem {
    pub item: InventoryItem,
    pub summary: InventorySummary,
    /// Threshold that was in effect (item's own, or the kitchen default).
    pub low_stock_threshold: Option<f64>,
}

impl SummarizedItem {
    /// Stock is positive but below the effective threshold.
    ///
    /// Independent of status precedence: an expired item can also be low.
    pub fn is_low_stock(&self) -> bool {
        let total = self.summary.total_quantity;
        total > 0.0 && self.low_stock_threshold.is_some_and(|t| total < t)
    }

    /// Next expiry falls within `[now, now + days]`.
    pub fn is_expiring_within(&self, days: u32, now: DateTime<Utc>) -> bool {
        self.summary
            .next_expiry
            .is_some_and(|expiry| within_days(expiry, now, days))
    }

    pub fn is_expired(&self) -> bool {
        self.summary.status == ItemStatus::Expired
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Duration;

    use super::*;

    pub(crate) fn item_with_threshold(threshold: Option<f64>) -> InventoryItem {
        InventoryItem::new(
            InventoryItemId::new(),
            KitchenId::new(),
            NewInventoryItem {
                name: "Basmati rice".to_string(),
                category: "Grains".to_string(),
                default_unit: "kg".to_string(),
                threshold,
                brand: None,
                tags: vec![],
                location: StorageLocation::Pantry,
            },
        )
        .unwrap()
    }

    fn summarized(total: f64, threshold: Option<f64>, next_expiry: Option<DateTime<Utc>>) -> SummarizedItem {
        SummarizedItem {
            item: item_with_threshold(threshold),
            summary: InventorySummary {
                total_quantity: total,
                status: ItemStatus::Ok,
                next_expiry,
            },
            low_stock_threshold: threshold,
        }
    }

    #[test]
    fn rejects_blank_name_and_bad_threshold() {
        let mut input = NewInventoryItem {
            name: " ".to_string(),
            category: String::new(),
            default_unit: "kg".to_string(),
            threshold: None,
            brand: None,
            tags: vec![],
            location: StorageLocation::Fridge,
        };
        assert!(InventoryItem::new(InventoryItemId::new(), KitchenId::new(), input.clone()).is_err());

        input.name = "Milk".to_string();
        input.threshold = Some(-2.0);
        assert!(InventoryItem::new(InventoryItemId::new(), KitchenId::new(), input).is_err());
    }

    #[test]
    fn threshold_can_be_changed_and_cleared() {
        let mut item = item_with_threshold(Some(1.0));
        item.set_threshold(Some(3.0)).unwrap();
        assert_eq!(item.threshold(), Some(3.0));
        item.set_threshold(None).unwrap();
        assert_eq!(item.threshold(), None);
        assert!(item.set_threshold(Some(f64::INFINITY)).is_err());
    }

    #[test]
    fn low_stock_needs_positive_stock_below_threshold() {
        assert!(summarized(0.5, Some(1.0), None).is_low_stock());
        assert!(!summarized(0.0, Some(1.0), None).is_low_stock());
        assert!(!summarized(1.0, Some(1.0), None).is_low_stock());
        assert!(!summarized(0.5, None, None).is_low_stock());
    }

    #[test]
    fn expiring_within_is_inclusive_of_both_ends() {
        let now = Utc::now();
        assert!(summarized(1.0, None, Some(now)).is_expiring_within(7, now));
        assert!(summarized(1.0, None, Some(now + Duration::days(7))).is_expiring_within(7, now));
        assert!(!summarized(1.0, None, Some(now + Duration::days(8))).is_expiring_within(7, now));
        assert!(!summarized(1.0, None, Some(now - Duration::seconds(1))).is_expiring_within(7, now));
        assert!(!summarized(1.0, None, None).is_expiring_within(7, now));
    }

    #[test]
    fn widest_window_does_not_overflow() {
        let now = Utc::now();
        let far = summarized(1.0, None, Some(now + Duration::days(365 * 50)));
        assert!(far.is_expiring_within(u32::MAX, now));
    }

    #[test]
    fn patch_is_all_or_nothing() {
        let mut item = item_with_threshold(Some(1.0));
        let bad = InventoryItemPatch {
            name: Some("Brown rice".to_string()),
            threshold: Some(-2.0),
            ..Default::default()
        };
        assert!(item.apply(bad).is_err());
        assert_eq!(item.name(), "Basmati rice");

        item.apply(InventoryItemPatch {
            name: Some("Brown rice".to_string()),
            threshold: Some(3.0),
            location: Some(StorageLocation::Container),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(item.name(), "Brown rice");
        assert_eq!(item.threshold(), Some(3.0));
        assert_eq!(item.location(), StorageLocation::Container);
        assert_eq!(item.category(), "Grains");
    }
}
