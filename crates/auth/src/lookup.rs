//! Read capabilities the guard consumes from storage collaborators.

use std::sync::Arc;

use thiserror::Error;

use larder_core::{HouseholdId, KitchenId};

use crate::{Membership, PrincipalId};

/// Failure of the underlying directory (datastore, remote service).
///
/// Distinct from "no such record": a missing kitchen or membership is a
/// successful lookup returning `None`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("directory lookup failed: {0}")]
    Backend(String),
}

/// Resolves which household owns a kitchen.
pub trait KitchenLookup: Send + Sync {
    fn kitchen_household(&self, kitchen_id: KitchenId) -> Result<Option<HouseholdId>, LookupError>;
}

/// Resolves a principal's membership in a household.
pub trait MembershipLookup: Send + Sync {
    fn membership(
        &self,
        principal_id: PrincipalId,
        household_id: HouseholdId,
    ) -> Result<Option<Membership>, LookupError>;
}

impl<S> KitchenLookup for Arc<S>
where
    S: KitchenLookup + ?Sized,
{
    fn kitchen_household(&self, kitchen_id: KitchenId) -> Result<Option<HouseholdId>, LookupError> {
        (**self).kitchen_household(kitchen_id)
    }
}

impl<S> MembershipLookup for Arc<S>
where
    S: MembershipLookup + ?Sized,
{
    fn membership(
        &self,
        principal_id: PrincipalId,
        household_id: HouseholdId,
    ) -> Result<Option<Membership>, LookupError> {
        (**self).membership(principal_id, household_id)
    }
}
