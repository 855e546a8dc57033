//! Kitchen operations with the access check in front of every one.
//!
//! Each public method follows the same shape:
//!
//! ```text
//! resolve kitchen id (directly, or via item / batch)
//!   ↓
//! AccessGuard (minimum role per KitchenOperation)   ── denied → abort, nothing read or written
//!   ↓
//! load snapshot / apply change
//!   ↓
//! InventoryAggregator for every item surfaced
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use larder_auth::{
    AccessExplanation, AccessGuard, Household, HouseholdOperation, Kitchen, KitchenKind,
    KitchenOperation, Membership, Principal, PrincipalId, Role, explain_access,
};
use larder_core::{
    BatchId, DomainError, HouseholdId, InventoryItemId, KitchenId, ReminderId, ShoppingListId,
    ShoppingListItemId,
};
use larder_inventory::{
    BatchRevision, InventoryAggregator, InventoryBatch, InventoryItem, InventoryItemPatch, NewBatch,
    NewInventoryItem, SummarizedItem, UsageKind, UsageLog,
};
use larder_reminders::{NewReminder, Reminder};
use larder_scan::ReceiptScan;
use larder_shopping::{
    NewShoppingList, NewShoppingListItem, ShoppingList, ShoppingListItem, ShoppingListKind,
};

use crate::{InMemoryDirectory, InMemoryKitchenStore, LarderConfig, ServiceError};

type DirectoryGuard = AccessGuard<Arc<InMemoryDirectory>, Arc<InMemoryDirectory>>;

/// Outcome of receiving stock from a scanned receipt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptIntake {
    pub received: Vec<InventoryBatch>,
    /// Receipt lines whose name matched no item in the kitchen.
    pub unmatched: Vec<String>,
}

pub struct KitchenService {
    guard: DirectoryGuard,
    directory: Arc<InMemoryDirectory>,
    store: Arc<InMemoryKitchenStore>,
    aggregator: InventoryAggregator,
}

impl KitchenService {
    pub const DEFAULT_REMINDER_WINDOW_DAYS: u32 = 7;

    pub fn new(
        directory: Arc<InMemoryDirectory>,
        store: Arc<InMemoryKitchenStore>,
        aggregator: InventoryAggregator,
    ) -> Self {
        Self {
            guard: AccessGuard::new(directory.clone(), directory.clone()),
            directory,
            store,
            aggregator,
        }
    }

    /// Fresh in-memory stores with the configured aggregation settings.
    pub fn in_memory(config: &LarderConfig) -> Self {
        Self::new(
            Arc::new(InMemoryDirectory::new()),
            Arc::new(InMemoryKitchenStore::new()),
            config.inventory,
        )
    }

    pub fn directory(&self) -> &Arc<InMemoryDirectory> {
        &self.directory
    }

    pub fn aggregator(&self) -> &InventoryAggregator {
        &self.aggregator
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Households & kitchens
    // ─────────────────────────────────────────────────────────────────────────

    /// Any authenticated principal may create a household; they become its owner.
    pub fn create_household(
        &self,
        principal: &Principal,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Household, ServiceError> {
        let household = Household::new(HouseholdId::new(), name, principal.principal_id, now)?;
        self.directory.insert_household(household.clone())?;
        tracing::info!(household_id = %household.id, principal_id = %principal.principal_id, "household created");
        Ok(household)
    }

    pub fn create_kitchen(
        &self,
        principal: &Principal,
        household_id: HouseholdId,
        name: &str,
        kind: KitchenKind,
    ) -> Result<Kitchen, ServiceError> {
        self.guard
            .check_household_operation(principal, household_id, HouseholdOperation::CreateKitchen)?;
        let kitchen = Kitchen::new(KitchenId::new(), household_id, name, kind)?;
        self.directory.insert_kitchen(kitchen.clone())?;
        tracing::info!(kitchen_id = %kitchen.id, household_id = %household_id, "kitchen created");
        Ok(kitchen)
    }

    pub fn view_kitchen(&self, principal: &Principal, kitchen_id: KitchenId) -> Result<Kitchen, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ViewKitchen, |_| {
                Ok(self
                    .directory
                    .kitchen(kitchen_id)?
                    .ok_or(DomainError::not_found("kitchen"))?)
            })
    }

    pub fn update_kitchen(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        name: Option<String>,
        kind: Option<KitchenKind>,
    ) -> Result<Kitchen, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::UpdateKitchen, |_| {
                let kitchen = self.directory.update_kitchen(kitchen_id, |kitchen| {
                    if let Some(name) = name {
                        kitchen.rename(name)?;
                    }
                    if let Some(kind) = kind {
                        kitchen.kind = kind;
                    }
                    Ok(())
                })?;
                tracing::info!(kitchen_id = %kitchen_id, "kitchen updated");
                Ok(kitchen)
            })
    }

    /// Add someone to a household.
    ///
    /// Inviters cannot grant a role above their own.
    pub fn invite_member(
        &self,
        principal: &Principal,
        household_id: HouseholdId,
        invitee: PrincipalId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Membership, ServiceError> {
        let authorized = self.guard.check_household_operation(
            principal,
            household_id,
            HouseholdOperation::InviteMember,
        )?;
        if role > authorized.role {
            return Err(DomainError::invariant(format!(
                "cannot grant {role} while holding {}",
                authorized.role
            ))
            .into());
        }

        let membership = Membership {
            principal_id: invitee,
            household_id,
            role,
            joined_at: now,
        };
        self.directory.insert_membership(membership.clone())?;
        tracing::info!(household_id = %household_id, invitee = %invitee, role = %role, "member invited");
        Ok(membership)
    }

    pub fn delete_kitchen(&self, principal: &Principal, kitchen_id: KitchenId) -> Result<(), ServiceError> {
        self.guard
            .check_operation(principal, kitchen_id, KitchenOperation::DeleteKitchen)?;
        self.directory.remove_kitchen(kitchen_id)?;
        let items = self.store.remove_kitchen(kitchen_id)?;
        tracing::info!(kitchen_id = %kitchen_id, items_removed = items, "kitchen deleted");
        Ok(())
    }

    /// Delete a household and everything it owns. Owner only.
    pub fn delete_household(&self, principal: &Principal, household_id: HouseholdId) -> Result<(), ServiceError> {
        self.guard
            .check_household_operation(principal, household_id, HouseholdOperation::Delete)?;
        let kitchens = self.directory.remove_household(household_id)?;
        for kitchen_id in &kitchens {
            self.store.remove_kitchen(*kitchen_id)?;
        }
        tracing::info!(household_id = %household_id, kitchens_removed = kitchens.len(), "household deleted");
        Ok(())
    }

    /// Audit view of a decision. For operators; never return this to the
    /// principal being checked.
    pub fn explain(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        operation: KitchenOperation,
    ) -> AccessExplanation {
        explain_access(
            self.guard.kitchens(),
            self.guard.memberships(),
            principal,
            kitchen_id,
            operation.minimum_role(),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inventory reads
    // ─────────────────────────────────────────────────────────────────────────

    pub fn list_inventory(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        now: DateTime<Utc>,
    ) -> Result<Vec<SummarizedItem>, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ListInventory, |_| {
                self.summarize_kitchen(kitchen_id, now)
            })
    }

    pub fn inventory_item(
        &self,
        principal: &Principal,
        item_id: InventoryItemId,
        now: DateTime<Utc>,
    ) -> Result<SummarizedItem, ServiceError> {
        let kitchen_id = self.kitchen_of_item(item_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ViewInventoryItem, |_| {
                let item = self
                    .store
                    .item(item_id)?
                    .ok_or(DomainError::not_found("inventory item"))?;
                let batches = self.store.batches_of(item_id)?;
                Ok(self.aggregator.summarize(&item, &batches, now)?)
            })
    }

    pub fn low_stock_items(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        now: DateTime<Utc>,
    ) -> Result<Vec<SummarizedItem>, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ListLowStock, |_| {
                let mut items = self.summarize_kitchen(kitchen_id, now)?;
                items.retain(SummarizedItem::is_low_stock);
                Ok(items)
            })
    }

    /// Items whose next expiry falls within `days` (default: the configured
    /// expiring window), soonest first.
    pub fn expiring_items(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SummarizedItem>, ServiceError> {
        let days = days.unwrap_or(self.aggregator.expiring_window_days);
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ListExpiring, |_| {
                let mut items = self.summarize_kitchen(kitchen_id, now)?;
                items.retain(|i| i.is_expiring_within(days, now));
                items.sort_by_key(|i| i.summary.next_expiry);
                Ok(items)
            })
    }

    pub fn usage_logs(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        limit: usize,
    ) -> Result<Vec<UsageLog>, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ListInventory, |_| {
                self.store.usage_logs(kitchen_id, limit)
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inventory writes
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_item(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        input: NewInventoryItem,
    ) -> Result<InventoryItem, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::CreateInventoryItem, |_| {
                let item = InventoryItem::new(InventoryItemId::new(), kitchen_id, input)?;
                self.store.insert_item(item.clone())?;
                tracing::info!(item_id = %item.id(), kitchen_id = %kitchen_id, "inventory item created");
                Ok(item)
            })
    }

    pub fn add_batch(
        &self,
        principal: &Principal,
        item_id: InventoryItemId,
        input: NewBatch,
    ) -> Result<InventoryBatch, ServiceError> {
        let kitchen_id = self.kitchen_of_item(item_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::CreateBatch, |_| {
                let batch = InventoryBatch::receive(BatchId::new(), item_id, input)?;
                self.store.insert_batch(batch.clone())?;
                tracing::info!(batch_id = %batch.id, item_id = %item_id, quantity = batch.quantity, "batch received");
                Ok(batch)
            })
    }

    pub fn update_item(
        &self,
        principal: &Principal,
        item_id: InventoryItemId,
        patch: InventoryItemPatch,
    ) -> Result<InventoryItem, ServiceError> {
        let kitchen_id = self.kitchen_of_item(item_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::UpdateInventoryItem, |_| {
                let item = self
                    .store
                    .update_item(item_id, |item| Ok(item.apply(patch)?))?;
                tracing::info!(item_id = %item_id, "inventory item updated");
                Ok(item)
            })
    }

    /// Delete an item together with its batches and usage history.
    pub fn delete_item(&self, principal: &Principal, item_id: InventoryItemId) -> Result<(), ServiceError> {
        let kitchen_id = self.kitchen_of_item(item_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::DeleteInventoryItem, |_| {
                self.store.remove_item(item_id)?;
                tracing::info!(item_id = %item_id, kitchen_id = %kitchen_id, "inventory item deleted");
                Ok(())
            })
    }

    /// Correct a batch's quantity or expiry. Derived fields follow on the
    /// next read.
    pub fn update_batch(
        &self,
        principal: &Principal,
        batch_id: BatchId,
        revision: BatchRevision,
    ) -> Result<InventoryBatch, ServiceError> {
        let kitchen_id = self.kitchen_of_batch(batch_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::UpdateBatch, |_| {
                let batch = self
                    .store
                    .update_batch(batch_id, |batch| Ok(batch.revise(revision)?))?;
                tracing::info!(batch_id = %batch_id, quantity = batch.quantity, "batch revised");
                Ok(batch)
            })
    }

    pub fn delete_batch(&self, principal: &Principal, batch_id: BatchId) -> Result<(), ServiceError> {
        let kitchen_id = self.kitchen_of_batch(batch_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::DeleteBatch, |_| {
                self.store.remove_batch(batch_id)?;
                tracing::info!(batch_id = %batch_id, "batch deleted");
                Ok(())
            })
    }

    pub fn log_usage(
        &self,
        principal: &Principal,
        batch_id: BatchId,
        kind: UsageKind,
        quantity: f64,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<UsageLog, ServiceError> {
        let kitchen_id = self.kitchen_of_batch(batch_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::LogUsage, |_| {
                let log = self.store.record_usage(batch_id, kind, quantity, notes, now)?;
                tracing::info!(batch_id = %batch_id, kind = ?kind, quantity, "usage logged");
                Ok(log)
            })
    }

    /// Receive stock for every receipt line whose name matches an item in the
    /// kitchen (case-insensitive).
    pub fn receive_receipt(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        receipt: &ReceiptScan,
        purchased_at: DateTime<Utc>,
    ) -> Result<ReceiptIntake, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::CreateBatch, |_| {
                let items = self.store.items_in_kitchen(kitchen_id)?;
                let mut intake = ReceiptIntake {
                    received: Vec::new(),
                    unmatched: Vec::new(),
                };

                // Validate every line before storing any, so a bad line
                // leaves no partial stock behind.
                for (name, input) in receipt.restock_batches(purchased_at) {
                    let wanted = name.trim().to_lowercase();
                    let Some(item) = items.iter().find(|i| i.name().to_lowercase() == wanted) else {
                        intake.unmatched.push(name);
                        continue;
                    };
                    intake
                        .received
                        .push(InventoryBatch::receive(BatchId::new(), item.id(), input)?);
                }
                self.store.insert_batches(intake.received.clone())?;

                tracing::info!(
                    kitchen_id = %kitchen_id,
                    received = intake.received.len(),
                    unmatched = intake.unmatched.len(),
                    "receipt received"
                );
                Ok(intake)
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shopping
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a list pre-filled with every low-stock item of the kitchen.
    pub fn create_restock_list(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<ShoppingList, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ManageShoppingList, |_| {
                let inventory = self.summarize_kitchen(kitchen_id, now)?;
                let mut list =
                    ShoppingList::new(ShoppingListId::new(), kitchen_id, ShoppingListKind::Custom, title)?;
                let added = list.add_restock_items(&inventory);
                self.store.insert_shopping_list(list.clone())?;
                tracing::info!(kitchen_id = %kitchen_id, items = added, "restock list created");
                Ok(list)
            })
    }

    pub fn shopping_lists(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
    ) -> Result<Vec<ShoppingList>, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ListShoppingLists, |_| {
                self.store.shopping_lists(kitchen_id)
            })
    }

    pub fn create_shopping_list(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        input: NewShoppingList,
    ) -> Result<ShoppingList, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ManageShoppingList, |_| {
                let list = ShoppingList::create(ShoppingListId::new(), kitchen_id, input)?;
                self.store.insert_shopping_list(list.clone())?;
                tracing::info!(kitchen_id = %kitchen_id, title = list.title(), "shopping list created");
                Ok(list)
            })
    }

    /// Change a list's title and/or description.
    pub fn update_shopping_list(
        &self,
        principal: &Principal,
        list_id: ShoppingListId,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<ShoppingList, ServiceError> {
        let kitchen_id = self.kitchen_of_list(list_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ManageShoppingList, |_| {
                self.store.update_shopping_list(list_id, |list| {
                    let title = title.unwrap_or_else(|| list.title().to_string());
                    let description = description.or_else(|| list.description().map(str::to_string));
                    list.rename(title, description)?;
                    Ok(list.clone())
                })
            })
    }

    pub fn delete_shopping_list(&self, principal: &Principal, list_id: ShoppingListId) -> Result<(), ServiceError> {
        let kitchen_id = self.kitchen_of_list(list_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ManageShoppingList, |_| {
                self.store.remove_shopping_list(list_id)?;
                tracing::info!(list_id = %list_id, "shopping list deleted");
                Ok(())
            })
    }

    pub fn add_shopping_item(
        &self,
        principal: &Principal,
        list_id: ShoppingListId,
        input: NewShoppingListItem,
    ) -> Result<ShoppingListItem, ServiceError> {
        let kitchen_id = self.kitchen_of_list(list_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ManageShoppingList, |_| {
                self.store.update_shopping_list(list_id, |list| {
                    Ok(list.add_item(ShoppingListItemId::new(), input)?.clone())
                })
            })
    }

    /// Tick an entry off (or back on), optionally recording what it cost.
    pub fn set_item_purchased(
        &self,
        principal: &Principal,
        list_id: ShoppingListId,
        item_id: ShoppingListItemId,
        purchased: bool,
        price: Option<f64>,
    ) -> Result<ShoppingList, ServiceError> {
        let kitchen_id = self.kitchen_of_list(list_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ManageShoppingList, |_| {
                self.store.update_shopping_list(list_id, |list| {
                    list.mark_purchased(item_id, purchased, price)?;
                    Ok(list.clone())
                })
            })
    }

    pub fn remove_shopping_item(
        &self,
        principal: &Principal,
        list_id: ShoppingListId,
        item_id: ShoppingListItemId,
    ) -> Result<ShoppingListItem, ServiceError> {
        let kitchen_id = self.kitchen_of_list(list_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ManageShoppingList, |_| {
                self.store
                    .update_shopping_list(list_id, |list| Ok(list.remove_item(item_id)?))
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reminders
    // ─────────────────────────────────────────────────────────────────────────

    pub fn reminders(&self, principal: &Principal, kitchen_id: KitchenId) -> Result<Vec<Reminder>, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ListReminders, |_| {
                self.store.reminders(kitchen_id)
            })
    }

    /// Open reminders due within `days` (default 7), earliest first.
    pub fn upcoming_reminders(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reminder>, ServiceError> {
        let days = days.unwrap_or(Self::DEFAULT_REMINDER_WINDOW_DAYS);
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ListReminders, |_| {
                let mut reminders = self.store.reminders(kitchen_id)?;
                reminders.retain(|r| r.is_upcoming(now, days));
                Ok(reminders)
            })
    }

    pub fn create_reminder(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        input: NewReminder,
    ) -> Result<Reminder, ServiceError> {
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ManageReminder, |_| {
                let reminder = Reminder::new(ReminderId::new(), kitchen_id, input)?;
                self.store.insert_reminder(reminder.clone())?;
                tracing::info!(kitchen_id = %kitchen_id, kind = ?reminder.kind(), "reminder created");
                Ok(reminder)
            })
    }

    pub fn set_reminder_completed(
        &self,
        principal: &Principal,
        reminder_id: ReminderId,
        completed: bool,
    ) -> Result<Reminder, ServiceError> {
        let kitchen_id = self.kitchen_of_reminder(reminder_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ManageReminder, |_| {
                self.store
                    .update_reminder(reminder_id, |r| r.set_completed(completed))
            })
    }

    pub fn delete_reminder(&self, principal: &Principal, reminder_id: ReminderId) -> Result<(), ServiceError> {
        let kitchen_id = self.kitchen_of_reminder(reminder_id)?;
        self.guard
            .guarded(principal, kitchen_id, KitchenOperation::ManageReminder, |_| {
                self.store.remove_reminder(reminder_id)?;
                Ok(())
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist `Expired` for active batches past their expiry. Reads already
    /// treat them as expired; this only makes the stored status match.
    pub fn expire_due_batches(&self, now: DateTime<Utc>) -> Result<usize, ServiceError> {
        let expired = self.store.expire_due_batches(now)?;
        if expired > 0 {
            tracing::info!(expired, "batches marked expired");
        }
        Ok(expired)
    }

    fn summarize_kitchen(
        &self,
        kitchen_id: KitchenId,
        now: DateTime<Utc>,
    ) -> Result<Vec<SummarizedItem>, ServiceError> {
        self.store
            .kitchen_snapshot(kitchen_id)?
            .iter()
            .map(|(item, batches)| {
                self.aggregator
                    .summarize(item, batches, now)
                    .map_err(ServiceError::from)
            })
            .collect()
    }

    fn kitchen_of_item(&self, item_id: InventoryItemId) -> Result<KitchenId, ServiceError> {
        Ok(self
            .store
            .item(item_id)?
            .ok_or(DomainError::not_found("inventory item"))?
            .kitchen_id())
    }

    fn kitchen_of_batch(&self, batch_id: BatchId) -> Result<KitchenId, ServiceError> {
        let batch = self
            .store
            .batch(batch_id)?
            .ok_or(DomainError::not_found("inventory batch"))?;
        self.kitchen_of_item(batch.item_id)
    }

    fn kitchen_of_list(&self, list_id: ShoppingListId) -> Result<KitchenId, ServiceError> {
        Ok(self
            .store
            .shopping_list(list_id)?
            .ok_or(DomainError::not_found("shopping list"))?
            .kitchen_id())
    }

    fn kitchen_of_reminder(&self, reminder_id: ReminderId) -> Result<KitchenId, ServiceError> {
        Ok(self
            .store
            .reminder(reminder_id)?
            .ok_or(DomainError::not_found("reminder"))?
            .kitchen_id())
    }
}
