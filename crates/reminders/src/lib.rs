//! Scheduled reminders for a kitchen (restock, expiry, gas cylinder, ...).
//!
//! Delivery is someone else's job; this crate only models what is due when.

pub mod reminder;

pub use reminder::{NewReminder, Reminder, ReminderKind};
