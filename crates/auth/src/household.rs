//! Ownership records: households, their kitchens, and memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{DomainError, Entity, HouseholdId, KitchenId};

use crate::{PrincipalId, Role};

/// Top-level ownership boundary grouping kitchens and memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Household {
    pub id: HouseholdId,
    pub name: String,
    pub created_by: PrincipalId,
    pub created_at: DateTime<Utc>,
}

impl Household {
    pub fn new(
        id: HouseholdId,
        name: impl Into<String>,
        created_by: PrincipalId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("household name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            created_by,
            created_at,
        })
    }

    /// The membership the creator receives when the household is created.
    pub fn founding_membership(&self) -> Membership {
        Membership {
            principal_id: self.created_by,
            household_id: self.id,
            role: Role::Owner,
            joined_at: self.created_at,
        }
    }
}

impl Entity for Household {
    type Id = HouseholdId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// The role a principal holds within one household.
///
/// At most one membership exists per (principal, household) pair; stores
/// enforce this on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub principal_id: PrincipalId,
    pub household_id: HouseholdId,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// What a kitchen is used for.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KitchenKind {
    #[default]
    Home,
    Office,
    Pg,
    Hostel,
}

/// A scoped operational unit owning inventory, shopping lists and reminders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kitchen {
    pub id: KitchenId,
    pub household_id: HouseholdId,
    pub name: String,
    pub kind: KitchenKind,
}

impl Kitchen {
    pub fn new(
        id: KitchenId,
        household_id: HouseholdId,
        name: impl Into<String>,
        kind: KitchenKind,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("kitchen name cannot be empty"));
        }
        Ok(Self {
            id,
            household_id,
            name,
            kind,
        })
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("kitchen name cannot be empty"));
        }
        self.name = name;
        Ok(())
    }
}

impl Entity for Kitchen {
    type Id = KitchenId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
