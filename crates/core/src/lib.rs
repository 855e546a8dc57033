//! `larder-core`: shared domain building blocks.
//!
//! Identifiers, the domain error model, and the small entity/value-object
//! traits used by the kitchen crates. No infrastructure concerns live here.

pub mod entity;
pub mod error;
pub mod id;
pub mod time;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    BatchId, HouseholdId, InventoryItemId, KitchenId, PrincipalId, ReminderId, ShoppingListId,
    ShoppingListItemId,
};
pub use time::{days_after, within_days};
pub use value_object::ValueObject;
