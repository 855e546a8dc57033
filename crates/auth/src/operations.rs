//! The minimum role each guarded operation requires.
//!
//! Operations declare one minimum role instead of a set of allowed roles;
//! the total order on `Role` makes every higher role pass as well.

use serde::{Deserialize, Serialize};

use crate::Role;

/// Operations scoped to a single kitchen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KitchenOperation {
    ViewKitchen,
    ListInventory,
    ViewInventoryItem,
    ListLowStock,
    ListExpiring,
    CreateInventoryItem,
    UpdateInventoryItem,
    DeleteInventoryItem,
    CreateBatch,
    UpdateBatch,
    DeleteBatch,
    LogUsage,
    ListShoppingLists,
    ManageShoppingList,
    ListReminders,
    ManageReminder,
    UpdateKitchen,
    DeleteKitchen,
}

impl KitchenOperation {
    pub fn minimum_role(self) -> Role {
        use KitchenOperation::*;
        match self {
            ViewKitchen | ListInventory | ViewInventoryItem | ListLowStock | ListExpiring
            | ListShoppingLists | ListReminders => Role::Viewer,
            CreateInventoryItem | UpdateInventoryItem | DeleteInventoryItem | CreateBatch
            | UpdateBatch | DeleteBatch | LogUsage | ManageShoppingList | ManageReminder => {
                Role::Member
            }
            UpdateKitchen | DeleteKitchen => Role::Admin,
        }
    }

    /// Stable name used in logs and audit output.
    pub fn name(self) -> &'static str {
        use KitchenOperation::*;
        match self {
            ViewKitchen => "kitchen.view",
            ListInventory => "inventory.list",
            ViewInventoryItem => "inventory.view",
            ListLowStock => "inventory.low_stock",
            ListExpiring => "inventory.expiring",
            CreateInventoryItem => "inventory.create",
            UpdateInventoryItem => "inventory.update",
            DeleteInventoryItem => "inventory.delete",
            CreateBatch => "inventory.batch.create",
            UpdateBatch => "inventory.batch.update",
            DeleteBatch => "inventory.batch.delete",
            LogUsage => "inventory.usage.log",
            ListShoppingLists => "shopping.list",
            ManageShoppingList => "shopping.manage",
            ListReminders => "reminders.list",
            ManageReminder => "reminders.manage",
            UpdateKitchen => "kitchen.update",
            DeleteKitchen => "kitchen.delete",
        }
    }

    pub fn is_read_only(self) -> bool {
        self.minimum_role() == Role::Viewer
    }
}

/// Operations scoped to a household rather than one of its kitchens.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseholdOperation {
    View,
    CreateKitchen,
    Update,
    InviteMember,
    Delete,
}

impl HouseholdOperation {
    pub fn minimum_role(self) -> Role {
        match self {
            HouseholdOperation::View => Role::Viewer,
            HouseholdOperation::CreateKitchen
            | HouseholdOperation::Update
            | HouseholdOperation::InviteMember => Role::Admin,
            HouseholdOperation::Delete => Role::Owner,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HouseholdOperation::View => "household.view",
            HouseholdOperation::CreateKitchen => "household.kitchen.create",
            HouseholdOperation::Update => "household.update",
            HouseholdOperation::InviteMember => "household.member.invite",
            HouseholdOperation::Delete => "household.delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_need_viewer_and_inventory_writes_need_member() {
        assert_eq!(KitchenOperation::ListInventory.minimum_role(), Role::Viewer);
        assert_eq!(KitchenOperation::CreateBatch.minimum_role(), Role::Member);
        assert_eq!(KitchenOperation::LogUsage.minimum_role(), Role::Member);
        assert!(KitchenOperation::ListExpiring.is_read_only());
        assert!(!KitchenOperation::DeleteKitchen.is_read_only());
    }

    #[test]
    fn destructive_operations_need_elevated_roles() {
        assert_eq!(KitchenOperation::DeleteKitchen.minimum_role(), Role::Admin);
        assert_eq!(HouseholdOperation::InviteMember.minimum_role(), Role::Admin);
        assert_eq!(HouseholdOperation::Delete.minimum_role(), Role::Owner);
    }
}
