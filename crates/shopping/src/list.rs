use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{
    DomainError, Entity, InventoryItemId, KitchenId, ShoppingListId, ShoppingListItemId,
    ValueObject,
};
use larder_inventory::SummarizedItem;

/// What the list is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShoppingListKind {
    Daily,
    Weekly,
    Monthly,
    Festival,
    Event,
    #[default]
    Custom,
}

/// Entry on a list; optionally linked back to the inventory item it restocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListItem {
    pub id: ShoppingListItemId,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub linked_item_id: Option<InventoryItemId>,
    pub is_purchased: bool,
    pub price: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShoppingListItem {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub linked_item_id: Option<InventoryItemId>,
    pub price: Option<f64>,
    pub notes: Option<String>,
}

impl NewShoppingListItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: None,
            unit: None,
            linked_item_id: None,
            price: None,
            notes: None,
        }
    }
}

/// Derived totals of a list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListSummary {
    pub total_items: usize,
    pub completed_items: usize,
    /// Sum of `price` over entries that carry one.
    pub estimated_total: f64,
}

impl ValueObject for ShoppingListSummary {}

/// Input for creating a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShoppingList {
    #[serde(default)]
    pub kind: ShoppingListKind,
    pub title: String,
    pub description: Option<String>,
    pub for_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    id: ShoppingListId,
    kitchen_id: KitchenId,
    kind: ShoppingListKind,
    title: String,
    description: Option<String>,
    for_date: Option<DateTime<Utc>>,
    items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn new(
        id: ShoppingListId,
        kitchen_id: KitchenId,
        kind: ShoppingListKind,
        title: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        Ok(Self {
            id,
            kitchen_id,
            kind,
            title,
            description: None,
            for_date: None,
            items: Vec::new(),
        })
    }

    pub fn create(id: ShoppingListId, kitchen_id: KitchenId, input: NewShoppingList) -> Result<Self, DomainError> {
        let mut list = Self::new(id, kitchen_id, input.kind, input.title)?;
        list.description = input.description;
        list.for_date = input.for_date;
        Ok(list)
    }

    pub fn kitchen_id(&self) -> KitchenId {
        self.kitchen_id
    }

    pub fn kind(&self) -> ShoppingListKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn for_date(&self) -> Option<DateTime<Utc>> {
        self.for_date
    }

    pub fn items(&self) -> &[ShoppingListItem] {
        &self.items
    }

    /// A list is complete once every entry is purchased. Empty lists are not.
    pub fn is_completed(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| i.is_purchased)
    }

    pub fn rename(&mut self, title: impl Into<String>, description: Option<String>) -> Result<(), DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        self.title = title;
        self.description = description;
        Ok(())
    }

    pub fn schedule_for(&mut self, date: Option<DateTime<Utc>>) {
        self.for_date = date;
    }

    pub fn add_item(&mut self, id: ShoppingListItemId, input: NewShoppingListItem) -> Result<&ShoppingListItem, DomainError> {
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        validate_amount("quantity", input.quantity)?;
        validate_amount("price", input.price)?;
        if self.items.iter().any(|i| i.id == id) {
            return Err(DomainError::conflict(format!("item {id} already on list")));
        }

        self.items.push(ShoppingListItem {
            id,
            name: input.name,
            quantity: input.quantity,
            unit: input.unit,
            linked_item_id: input.linked_item_id,
            is_purchased: false,
            price: input.price,
            notes: input.notes,
        });
        Ok(&self.items[self.items.len() - 1])
    }

    /// Mark an entry bought (or not), optionally recording what it cost.
    pub fn mark_purchased(
        &mut self,
        id: ShoppingListItemId,
        purchased: bool,
        price: Option<f64>,
    ) -> Result<(), DomainError> {
        validate_amount("price", price)?;
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(DomainError::not_found("shopping list item"))?;
        item.is_purchased = purchased;
        if price.is_some() {
            item.price = price;
        }
        Ok(())
    }

    pub fn remove_item(&mut self, id: ShoppingListItemId) -> Result<ShoppingListItem, DomainError> {
        let pos = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or(DomainError::not_found("shopping list item"))?;
        Ok(self.items.remove(pos))
    }

    /// Add an entry for every low-stock item not already on the list.
    ///
    /// The suggested quantity tops the item back up to its threshold. Returns
    /// how many entries were added.
    pub fn add_restock_items(&mut self, inventory: &[SummarizedItem]) -> usize {
        let mut added = 0;
        for entry in inventory.iter().filter(|e| e.is_low_stock()) {
            let item_id = entry.item.id();
            if self.items.iter().any(|i| i.linked_item_id == Some(item_id)) {
                continue;
            }
            let shortfall = entry
                .low_stock_threshold
                .map(|t| t - entry.summary.total_quantity);

            self.items.push(ShoppingListItem {
                id: ShoppingListItemId::new(),
                name: entry.item.name().to_string(),
                quantity: shortfall,
                unit: Some(entry.item.default_unit().to_string()),
                linked_item_id: Some(item_id),
                is_purchased: false,
                price: None,
                notes: None,
            });
            added += 1;
        }
        added
    }

    pub fn summary(&self) -> ShoppingListSummary {
        ShoppingListSummary {
            total_items: self.items.len(),
            completed_items: self.items.iter().filter(|i| i.is_purchased).count(),
            estimated_total: self.items.iter().filter_map(|i| i.price).sum(),
        }
    }
}

fn validate_amount(field: &str, value: Option<f64>) -> Result<(), DomainError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(DomainError::validation(format!("{field} must be a non-negative number")))
        }
        _ => Ok(()),
    }
}

impl Entity for ShoppingList {
    type Id = ShoppingListId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use larder_inventory::{
        InventoryAggregator, InventoryBatch, InventoryItem, NewBatch, NewInventoryItem,
        StorageLocation,
    };
    use larder_core::BatchId;

    use super::*;

    fn list() -> ShoppingList {
        ShoppingList::new(ShoppingListId::new(), KitchenId::new(), ShoppingListKind::Weekly, "Weekly shop")
            .unwrap()
    }

    fn priced(name: &str, price: Option<f64>) -> NewShoppingListItem {
        NewShoppingListItem {
            price,
            ..NewShoppingListItem::named(name)
        }
    }

    #[test]
    fn summary_counts_items_and_sums_known_prices() {
        let mut list = list();
        let milk = ShoppingListItemId::new();
        list.add_item(milk, priced("Milk", Some(1.5))).unwrap();
        list.add_item(ShoppingListItemId::new(), priced("Eggs", None)).unwrap();
        list.add_item(ShoppingListItemId::new(), priced("Bread", Some(2.25))).unwrap();
        list.mark_purchased(milk, true, None).unwrap();

        let summary = list.summary();
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.completed_items, 1);
        assert_eq!(summary.estimated_total, 3.75);
        assert!(!list.is_completed());
    }

    #[test]
    fn empty_list_is_not_completed() {
        let list = list();
        assert!(!list.is_completed());
        assert_eq!(list.summary().estimated_total, 0.0);
    }

    #[test]
    fn marking_unknown_item_is_not_found() {
        let mut list = list();
        let err = list.mark_purchased(ShoppingListItemId::new(), true, None).unwrap_err();
        assert_eq!(err, DomainError::not_found("shopping list item"));
    }

    #[test]
    fn rejects_negative_price_and_duplicate_ids() {
        let mut list = list();
        assert!(list.add_item(ShoppingListItemId::new(), priced("Oil", Some(-1.0))).is_err());

        let id = ShoppingListItemId::new();
        list.add_item(id, priced("Oil", None)).unwrap();
        assert!(matches!(
            list.add_item(id, priced("Oil", None)),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn restock_adds_each_low_item_once() {
        let kitchen = KitchenId::new();
        let item = InventoryItem::new(
            InventoryItemId::new(),
            kitchen,
            NewInventoryItem {
                name: "Atta".to_string(),
                category: "Grains".to_string(),
                default_unit: "kg".to_string(),
                threshold: Some(5.0),
                brand: None,
                tags: vec![],
                location: StorageLocation::Pantry,
            },
        )
        .unwrap();
        let batch = InventoryBatch::receive(BatchId::new(), item.id(), NewBatch::new(2.0, "kg")).unwrap();
        let summarized = InventoryAggregator::default()
            .summarize(&item, &[batch], Utc::now())
            .unwrap();

        let mut list = list();
        assert_eq!(list.add_restock_items(std::slice::from_ref(&summarized)), 1);
        assert_eq!(list.add_restock_items(&[summarized]), 0);

        let entry = &list.items()[0];
        assert_eq!(entry.linked_item_id, Some(item.id()));
        assert_eq!(entry.quantity, Some(3.0));
        assert_eq!(entry.unit.as_deref(), Some("kg"));
    }

    proptest! {
        /// Property: completed items never exceed total items.
        #[test]
        fn completed_never_exceeds_total(flags in prop::collection::vec(any::<bool>(), 0..20)) {
            let mut list = list();
            for purchased in flags {
                let id = ShoppingListItemId::new();
                list.add_item(id, NewShoppingListItem::named("thing")).unwrap();
                list.mark_purchased(id, purchased, None).unwrap();
            }
            let summary = list.summary();
            prop_assert!(summary.completed_items <= summary.total_items);
            prop_assert_eq!(list.is_completed(), summary.total_items > 0 && summary.completed_items == summary.total_items);
        }
    }
}
