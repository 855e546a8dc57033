//! In-memory storage of everything a kitchen owns.
//!
//! Updates run against a clone of the stored record and replace it only when
//! the closure succeeds, so a failed edit never leaves a half-applied record.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use larder_core::{
    BatchId, DomainError, Entity, InventoryItemId, KitchenId, ReminderId, ShoppingListId,
};
use larder_inventory::{InventoryBatch, InventoryItem, UsageKind, UsageLog};
use larder_reminders::Reminder;
use larder_shopping::ShoppingList;

use crate::ServiceError;

#[derive(Debug, Default)]
struct StoreState {
    items: HashMap<InventoryItemId, InventoryItem>,
    batches: HashMap<BatchId, InventoryBatch>,
    usage_logs: Vec<UsageLog>,
    shopping_lists: HashMap<ShoppingListId, ShoppingList>,
    reminders: HashMap<ReminderId, Reminder>,
}

#[derive(Debug, Default)]
pub struct InMemoryKitchenStore {
    inner: RwLock<StoreState>,
}

impl InMemoryKitchenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, ServiceError> {
        self.inner.read().map_err(|_| ServiceError::poisoned("kitchen store"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, ServiceError> {
        self.inner.write().map_err(|_| ServiceError::poisoned("kitchen store"))
    }

    pub fn insert_item(&self, item: InventoryItem) -> Result<(), ServiceError> {
        let mut state = self.write()?;
        if state.items.contains_key(&item.id()) {
            return Err(DomainError::conflict(format!("item {} already exists", item.id())).into());
        }
        state.items.insert(item.id(), item);
        Ok(())
    }

    pub fn item(&self, item_id: InventoryItemId) -> Result<Option<InventoryItem>, ServiceError> {
        let state = self.read()?;
        Ok(state.items.get(&item_id).cloned())
    }

    pub fn update_item<F>(&self, item_id: InventoryItemId, f: F) -> Result<InventoryItem, ServiceError>
    where
        F: FnOnce(&mut InventoryItem) -> Result<(), ServiceError>,
    {
        let mut state = self.write()?;
        let stored = state
            .items
            .get_mut(&item_id)
            .ok_or(DomainError::not_found("inventory item"))?;
        let mut draft = stored.clone();
        f(&mut draft)?;
        *stored = draft.clone();
        Ok(draft)
    }

    /// Remove an item with its batches and usage history.
    pub fn remove_item(&self, item_id: InventoryItemId) -> Result<InventoryItem, ServiceError> {
        let mut state = self.write()?;
        let item = state
            .items
            .remove(&item_id)
            .ok_or(DomainError::not_found("inventory item"))?;
        state.batches.retain(|_, b| b.item_id != item_id);
        state.usage_logs.retain(|log| log.item_id != item_id);
        Ok(item)
    }

    /// Items of a kitchen, ordered by name.
    pub fn items_in_kitchen(&self, kitchen_id: KitchenId) -> Result<Vec<InventoryItem>, ServiceError> {
        let state = self.read()?;
        let mut items: Vec<InventoryItem> = state
            .items
            .values()
            .filter(|i| i.kitchen_id() == kitchen_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(items)
    }

    /// Every batch of an item, in any status, oldest first.
    pub fn batches_of(&self, item_id: InventoryItemId) -> Result<Vec<InventoryBatch>, ServiceError> {
        let state = self.read()?;
        let mut batches: Vec<InventoryBatch> = state
            .batches
            .values()
            .filter(|b| b.item_id == item_id)
            .cloned()
            .collect();
        batches.sort_by_key(|b| b.id);
        Ok(batches)
    }

    /// Snapshot of each item in a kitchen with its batches, taken under one
    /// read lock.
    pub fn kitchen_snapshot(
        &self,
        kitchen_id: KitchenId,
    ) -> Result<Vec<(InventoryItem, Vec<InventoryBatch>)>, ServiceError> {
        let state = self.read()?;
        let mut items: Vec<&InventoryItem> = state
            .items
            .values()
            .filter(|i| i.kitchen_id() == kitchen_id)
            .collect();
        items.sort_by(|a, b| a.name().cmp(b.name()));

        Ok(items
            .into_iter()
            .map(|item| {
                let mut batches: Vec<InventoryBatch> = state
                    .batches
                    .values()
                    .filter(|b| b.item_id == item.id())
                    .cloned()
                    .collect();
                batches.sort_by_key(|b| b.id);
                (item.clone(), batches)
            })
            .collect())
    }

    pub fn insert_batch(&self, batch: InventoryBatch) -> Result<(), ServiceError> {
        let mut state = self.write()?;
        if !state.items.contains_key(&batch.item_id) {
            return Err(DomainError::not_found("inventory item").into());
        }
        if state.batches.contains_key(&batch.id) {
            return Err(DomainError::conflict(format!("batch {} already exists", batch.id)).into());
        }
        state.batches.insert(batch.id, batch);
        Ok(())
    }

    /// Insert every batch or none of them.
    pub fn insert_batches(&self, batches: Vec<InventoryBatch>) -> Result<(), ServiceError> {
        let mut state = self.write()?;
        for (i, batch) in batches.iter().enumerate() {
            if !state.items.contains_key(&batch.item_id) {
                return Err(DomainError::not_found("inventory item").into());
            }
            if state.batches.contains_key(&batch.id) || batches[..i].iter().any(|b| b.id == batch.id) {
                return Err(DomainError::conflict(format!("batch {} already exists", batch.id)).into());
            }
        }
        for batch in batches {
            state.batches.insert(batch.id, batch);
        }
        Ok(())
    }

    pub fn update_batch<F>(&self, batch_id: BatchId, f: F) -> Result<InventoryBatch, ServiceError>
    where
        F: FnOnce(&mut InventoryBatch) -> Result<(), ServiceError>,
    {
        let mut state = self.write()?;
        let stored = state
            .batches
            .get_mut(&batch_id)
            .ok_or(DomainError::not_found("inventory batch"))?;
        let mut draft = stored.clone();
        f(&mut draft)?;
        *stored = draft.clone();
        Ok(draft)
    }

    /// Remove a batch. Usage logs that reference it are kept as history.
    pub fn remove_batch(&self, batch_id: BatchId) -> Result<InventoryBatch, ServiceError> {
        let mut state = self.write()?;
        state
            .batches
            .remove(&batch_id)
            .ok_or_else(|| DomainError::not_found("inventory batch").into())
    }

    pub fn batch(&self, batch_id: BatchId) -> Result<Option<InventoryBatch>, ServiceError> {
        let state = self.read()?;
        Ok(state.batches.get(&batch_id).cloned())
    }

    /// Apply a usage action to a batch and append its log, atomically.
    pub fn record_usage(
        &self,
        batch_id: BatchId,
        kind: UsageKind,
        quantity: f64,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<UsageLog, ServiceError> {
        let mut state = self.write()?;
        let batch = state
            .batches
            .get_mut(&batch_id)
            .ok_or(DomainError::not_found("inventory batch"))?;
        let log = batch.record_usage(kind, quantity, notes, at)?;
        state.usage_logs.push(log.clone());
        Ok(log)
    }

    /// Usage logs of a kitchen, newest first.
    pub fn usage_logs(&self, kitchen_id: KitchenId, limit: usize) -> Result<Vec<UsageLog>, ServiceError> {
        let state = self.read()?;
        Ok(state
            .usage_logs
            .iter()
            .rev()
            .filter(|log| {
                state
                    .items
                    .get(&log.item_id)
                    .is_some_and(|item| item.kitchen_id() == kitchen_id)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    /// Persist `Expired` on every active batch past its expiry date.
    pub fn expire_due_batches(&self, now: DateTime<Utc>) -> Result<usize, ServiceError> {
        let mut state = self.write()?;
        Ok(state
            .batches
            .values_mut()
            .map(|b| b.mark_expired_if_due(now))
            .filter(|changed| *changed)
            .count())
    }

    pub fn insert_shopping_list(&self, list: ShoppingList) -> Result<(), ServiceError> {
        let mut state = self.write()?;
        state.shopping_lists.insert(*list.id(), list);
        Ok(())
    }

    pub fn shopping_list(&self, list_id: ShoppingListId) -> Result<Option<ShoppingList>, ServiceError> {
        let state = self.read()?;
        Ok(state.shopping_lists.get(&list_id).cloned())
    }

    /// Edit a list in place; `f`'s result is returned on success.
    pub fn update_shopping_list<T, F>(&self, list_id: ShoppingListId, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut ShoppingList) -> Result<T, ServiceError>,
    {
        let mut state = self.write()?;
        let stored = state
            .shopping_lists
            .get_mut(&list_id)
            .ok_or(DomainError::not_found("shopping list"))?;
        let mut draft = stored.clone();
        let out = f(&mut draft)?;
        *stored = draft;
        Ok(out)
    }

    pub fn remove_shopping_list(&self, list_id: ShoppingListId) -> Result<ShoppingList, ServiceError> {
        let mut state = self.write()?;
        state
            .shopping_lists
            .remove(&list_id)
            .ok_or_else(|| DomainError::not_found("shopping list").into())
    }

    pub fn insert_reminder(&self, reminder: Reminder) -> Result<(), ServiceError> {
        let mut state = self.write()?;
        state.reminders.insert(*reminder.id(), reminder);
        Ok(())
    }

    pub fn reminder(&self, reminder_id: ReminderId) -> Result<Option<Reminder>, ServiceError> {
        let state = self.read()?;
        Ok(state.reminders.get(&reminder_id).cloned())
    }

    /// Reminders of a kitchen, earliest first.
    pub fn reminders(&self, kitchen_id: KitchenId) -> Result<Vec<Reminder>, ServiceError> {
        let state = self.read()?;
        let mut reminders: Vec<Reminder> = state
            .reminders
            .values()
            .filter(|r| r.kitchen_id() == kitchen_id)
            .cloned()
            .collect();
        reminders.sort_by_key(|r| (r.scheduled_at(), *r.id()));
        Ok(reminders)
    }

    pub fn update_reminder<F>(&self, reminder_id: ReminderId, f: F) -> Result<Reminder, ServiceError>
    where
        F: FnOnce(&mut Reminder),
    {
        let mut state = self.write()?;
        let stored = state
            .reminders
            .get_mut(&reminder_id)
            .ok_or(DomainError::not_found("reminder"))?;
        f(stored);
        Ok(stored.clone())
    }

    pub fn remove_reminder(&self, reminder_id: ReminderId) -> Result<Reminder, ServiceError> {
        let mut state = self.write()?;
        state
            .reminders
            .remove(&reminder_id)
            .ok_or_else(|| DomainError::not_found("reminder").into())
    }

    pub fn shopping_lists(&self, kitchen_id: KitchenId) -> Result<Vec<ShoppingList>, ServiceError> {
        let state = self.read()?;
        let mut lists: Vec<ShoppingList> = state
            .shopping_lists
            .values()
            .filter(|l| l.kitchen_id() == kitchen_id)
            .cloned()
            .collect();
        lists.sort_by_key(|l| *l.id());
        Ok(lists)
    }

    /// Drop everything a kitchen owns. Returns the number of items removed.
    pub fn remove_kitchen(&self, kitchen_id: KitchenId) -> Result<usize, ServiceError> {
        let mut state = self.write()?;
        let doomed: Vec<InventoryItemId> = state
            .items
            .values()
            .filter(|i| i.kitchen_id() == kitchen_id)
            .map(|i| i.id())
            .collect();

        for id in &doomed {
            state.items.remove(id);
        }
        state.batches.retain(|_, b| !doomed.contains(&b.item_id));
        state.usage_logs.retain(|log| !doomed.contains(&log.item_id));
        state.shopping_lists.retain(|_, l| l.kitchen_id() != kitchen_id);
        state.reminders.retain(|_, r| r.kitchen_id() != kitchen_id);
        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use larder_inventory::{BatchStatus, NewBatch, NewInventoryItem, StorageLocation};

    use super::*;

    fn item(kitchen_id: KitchenId, name: &str) -> InventoryItem {
        InventoryItem::new(
            InventoryItemId::new(),
            kitchen_id,
            NewInventoryItem {
                name: name.to_string(),
                category: "Dairy".to_string(),
                default_unit: "l".to_string(),
                threshold: None,
                brand: None,
                tags: vec![],
                location: StorageLocation::Fridge,
            },
        )
        .unwrap()
    }

    #[test]
    fn batch_requires_known_item() {
        let store = InMemoryKitchenStore::new();
        let batch = InventoryBatch::receive(BatchId::new(), InventoryItemId::new(), NewBatch::new(1.0, "l")).unwrap();
        assert!(matches!(
            store.insert_batch(batch),
            Err(ServiceError::Domain(DomainError::NotFound("inventory item")))
        ));
    }

    #[test]
    fn failed_usage_is_not_logged() {
        let store = InMemoryKitchenStore::new();
        let kitchen = KitchenId::new();
        let milk = item(kitchen, "Milk");
        let milk_id = milk.id();
        store.insert_item(milk).unwrap();
        let batch = InventoryBatch::receive(BatchId::new(), milk_id, NewBatch::new(1.0, "l")).unwrap();
        let batch_id = batch.id;
        store.insert_batch(batch).unwrap();

        assert!(store.record_usage(batch_id, UsageKind::Consumed, 5.0, None, Utc::now()).is_err());
        assert!(store.usage_logs(kitchen, 10).unwrap().is_empty());

        store.record_usage(batch_id, UsageKind::Consumed, 1.0, None, Utc::now()).unwrap();
        assert_eq!(store.usage_logs(kitchen, 10).unwrap().len(), 1);
        assert_eq!(store.batch(batch_id).unwrap().unwrap().status, BatchStatus::Used);
    }

    #[test]
    fn expire_sweep_persists_only_due_active_batches() {
        let store = InMemoryKitchenStore::new();
        let now = Utc::now();
        let milk = item(KitchenId::new(), "Milk");
        let milk_id = milk.id();
        store.insert_item(milk).unwrap();

        for days in [-2, -1, 3] {
            let input = NewBatch::new(1.0, "l").expiring_at(now + Duration::days(days));
            store
                .insert_batch(InventoryBatch::receive(BatchId::new(), milk_id, input).unwrap())
                .unwrap();
        }

        assert_eq!(store.expire_due_batches(now).unwrap(), 2);
        assert_eq!(store.expire_due_batches(now).unwrap(), 0);
    }

    #[test]
    fn removing_kitchen_drops_only_its_contents() {
        let store = InMemoryKitchenStore::new();
        let (a, b) = (KitchenId::new(), KitchenId::new());
        store.insert_item(item(a, "Milk")).unwrap();
        store.insert_item(item(b, "Curd")).unwrap();

        assert_eq!(store.remove_kitchen(a).unwrap(), 1);
        assert!(store.items_in_kitchen(a).unwrap().is_empty());
        assert_eq!(store.items_in_kitchen(b).unwrap().len(), 1);
    }

    #[test]
    fn bulk_insert_is_all_or_nothing() {
        let store = InMemoryKitchenStore::new();
        let milk = item(KitchenId::new(), "Milk");
        let milk_id = milk.id();
        store.insert_item(milk).unwrap();

        let good = InventoryBatch::receive(BatchId::new(), milk_id, NewBatch::new(1.0, "l")).unwrap();
        let orphan =
            InventoryBatch::receive(BatchId::new(), InventoryItemId::new(), NewBatch::new(1.0, "l")).unwrap();
        assert!(store.insert_batches(vec![good.clone(), orphan]).is_err());
        assert!(store.batches_of(milk_id).unwrap().is_empty());

        assert!(store.insert_batches(vec![good.clone(), good.clone()]).is_err());
        assert!(store.batches_of(milk_id).unwrap().is_empty());

        store.insert_batches(vec![good]).unwrap();
        assert_eq!(store.batches_of(milk_id).unwrap().len(), 1);
    }

    #[test]
    fn failed_update_leaves_the_record_alone() {
        let store = InMemoryKitchenStore::new();
        let milk = item(KitchenId::new(), "Milk");
        let milk_id = milk.id();
        store.insert_item(milk).unwrap();

        let err = store
            .update_item(milk_id, |item| {
                item.move_to(StorageLocation::Freezer);
                Err(DomainError::validation("rejected").into())
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
        assert_eq!(store.item(milk_id).unwrap().unwrap().location(), StorageLocation::Fridge);
    }

    #[test]
    fn removing_an_item_drops_its_batches() {
        let store = InMemoryKitchenStore::new();
        let milk = item(KitchenId::new(), "Milk");
        let milk_id = milk.id();
        store.insert_item(milk).unwrap();
        store
            .insert_batch(InventoryBatch::receive(BatchId::new(), milk_id, NewBatch::new(1.0, "l")).unwrap())
            .unwrap();

        store.remove_item(milk_id).unwrap();
        assert!(store.batches_of(milk_id).unwrap().is_empty());
        assert!(store.remove_item(milk_id).is_err());
    }
}
