//! Shopping lists for a kitchen.
//!
//! Lists are plain domain records; their totals are derived on read the same
//! way inventory summaries are.

pub mod list;

pub use list::{
    NewShoppingList, NewShoppingListItem, ShoppingList, ShoppingListItem, ShoppingListKind,
    ShoppingListSummary,
};
