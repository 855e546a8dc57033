//! Value object trait: equality by value, not identity.

/// Marker trait for values that are immutable and compared by their fields.
///
/// Derived read-side values (inventory summaries, shopping list totals) are
/// value objects: recomputing them from the same records yields an equal value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
