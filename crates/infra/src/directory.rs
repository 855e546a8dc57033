//! In-memory household directory (households, kitchens, memberships).
//!
//! Backs the guard's lookups in tests and single-process deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use larder_auth::{
    Household, Kitchen, KitchenLookup, LookupError, Membership, MembershipLookup, PrincipalId, Role,
};
use larder_core::{DomainError, HouseholdId, KitchenId};

use crate::ServiceError;

#[derive(Debug, Default)]
struct DirectoryState {
    households: HashMap<HouseholdId, Household>,
    kitchens: HashMap<KitchenId, Kitchen>,
    memberships: HashMap<(PrincipalId, HouseholdId), Membership>,
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a household together with its creator's owner membership.
    pub fn insert_household(&self, household: Household) -> Result<(), ServiceError> {
        let mut state = self.inner.write().map_err(|_| ServiceError::poisoned("directory"))?;
        if state.households.contains_key(&household.id) {
            return Err(DomainError::conflict(format!("household {} already exists", household.id)).into());
        }
        let founding = household.founding_membership();
        state
            .memberships
            .insert((founding.principal_id, founding.household_id), founding);
        state.households.insert(household.id, household);
        Ok(())
    }

    pub fn insert_kitchen(&self, kitchen: Kitchen) -> Result<(), ServiceError> {
        let mut state = self.inner.write().map_err(|_| ServiceError::poisoned("directory"))?;
        if !state.households.contains_key(&kitchen.household_id) {
            return Err(DomainError::not_found("household").into());
        }
        if state.kitchens.contains_key(&kitchen.id) {
            return Err(DomainError::conflict(format!("kitchen {} already exists", kitchen.id)).into());
        }
        state.kitchens.insert(kitchen.id, kitchen);
        Ok(())
    }

    /// Add a membership. One membership per (principal, household).
    pub fn insert_membership(&self, membership: Membership) -> Result<(), ServiceError> {
        let mut state = self.inner.write().map_err(|_| ServiceError::poisoned("directory"))?;
        if !state.households.contains_key(&membership.household_id) {
            return Err(DomainError::not_found("household").into());
        }
        let key = (membership.principal_id, membership.household_id);
        if state.memberships.contains_key(&key) {
            return Err(DomainError::conflict("principal is already a member of this household").into());
        }
        state.memberships.insert(key, membership);
        Ok(())
    }

    pub fn set_role(
        &self,
        principal_id: PrincipalId,
        household_id: HouseholdId,
        role: Role,
    ) -> Result<(), ServiceError> {
        let mut state = self.inner.write().map_err(|_| ServiceError::poisoned("directory"))?;
        let membership = state
            .memberships
            .get_mut(&(principal_id, household_id))
            .ok_or(DomainError::not_found("membership"))?;
        membership.role = role;
        Ok(())
    }

    /// Remove a household, cascading to its kitchens and memberships.
    ///
    /// Returns the ids of the removed kitchens so their contents can be
    /// dropped as well.
    pub fn remove_household(&self, household_id: HouseholdId) -> Result<Vec<KitchenId>, ServiceError> {
        let mut state = self.inner.write().map_err(|_| ServiceError::poisoned("directory"))?;
        if state.households.remove(&household_id).is_none() {
            return Err(DomainError::not_found("household").into());
        }

        let kitchens: Vec<KitchenId> = state
            .kitchens
            .values()
            .filter(|k| k.household_id == household_id)
            .map(|k| k.id)
            .collect();
        for id in &kitchens {
            state.kitchens.remove(id);
        }
        state.memberships.retain(|(_, h), _| *h != household_id);
        Ok(kitchens)
    }

    /// Edit a kitchen; the stored record changes only if `f` succeeds.
    pub fn update_kitchen<F>(&self, kitchen_id: KitchenId, f: F) -> Result<Kitchen, ServiceError>
    where
        F: FnOnce(&mut Kitchen) -> Result<(), ServiceError>,
    {
        let mut state = self.inner.write().map_err(|_| ServiceError::poisoned("directory"))?;
        let stored = state
            .kitchens
            .get_mut(&kitchen_id)
            .ok_or(DomainError::not_found("kitchen"))?;
        let mut draft = stored.clone();
        f(&mut draft)?;
        *stored = draft.clone();
        Ok(draft)
    }

    pub fn remove_kitchen(&self, kitchen_id: KitchenId) -> Result<Kitchen, ServiceError> {
        let mut state = self.inner.write().map_err(|_| ServiceError::poisoned("directory"))?;
        state
            .kitchens
            .remove(&kitchen_id)
            .ok_or_else(|| DomainError::not_found("kitchen").into())
    }

    pub fn kitchen(&self, kitchen_id: KitchenId) -> Result<Option<Kitchen>, ServiceError> {
        let state = self.inner.read().map_err(|_| ServiceError::poisoned("directory"))?;
        Ok(state.kitchens.get(&kitchen_id).cloned())
    }

    pub fn household(&self, household_id: HouseholdId) -> Result<Option<Household>, ServiceError> {
        let state = self.inner.read().map_err(|_| ServiceError::poisoned("directory"))?;
        Ok(state.households.get(&household_id).cloned())
    }

    pub fn kitchens_of(&self, household_id: HouseholdId) -> Result<Vec<Kitchen>, ServiceError> {
        let state = self.inner.read().map_err(|_| ServiceError::poisoned("directory"))?;
        let mut kitchens: Vec<Kitchen> = state
            .kitchens
            .values()
            .filter(|k| k.household_id == household_id)
            .cloned()
            .collect();
        kitchens.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(kitchens)
    }
}

impl KitchenLookup for InMemoryDirectory {
    fn kitchen_household(&self, kitchen_id: KitchenId) -> Result<Option<HouseholdId>, LookupError> {
        let state = self
            .inner
            .read()
            .map_err(|_| LookupError::Unavailable("directory lock poisoned".to_string()))?;
        Ok(state.kitchens.get(&kitchen_id).map(|k| k.household_id))
    }
}

impl MembershipLookup for InMemoryDirectory {
    fn membership(
        &self,
        principal_id: PrincipalId,
        household_id: HouseholdId,
    ) -> Result<Option<Membership>, LookupError> {
        let state = self
            .inner
            .read()
            .map_err(|_| LookupError::Unavailable("directory lock poisoned".to_string()))?;
        Ok(state.memberships.get(&(principal_id, household_id)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use larder_auth::KitchenKind;

    use super::*;

    fn seeded() -> (InMemoryDirectory, PrincipalId, HouseholdId, KitchenId) {
        let dir = InMemoryDirectory::new();
        let owner = PrincipalId::new();
        let household = Household::new(HouseholdId::new(), "Home", owner, Utc::now()).unwrap();
        let household_id = household.id;
        dir.insert_household(household).unwrap();

        let kitchen = Kitchen::new(KitchenId::new(), household_id, "Main", KitchenKind::Home).unwrap();
        let kitchen_id = kitchen.id;
        dir.insert_kitchen(kitchen).unwrap();
        (dir, owner, household_id, kitchen_id)
    }

    #[test]
    fn creator_is_owner_and_kitchen_resolves_to_household() {
        let (dir, owner, household_id, kitchen_id) = seeded();
        assert_eq!(dir.kitchen_household(kitchen_id).unwrap(), Some(household_id));
        let membership = dir.membership(owner, household_id).unwrap().unwrap();
        assert_eq!(membership.role, Role::Owner);
    }

    #[test]
    fn second_membership_for_same_pair_conflicts() {
        let (dir, owner, household_id, _) = seeded();
        let err = dir
            .insert_membership(Membership {
                principal_id: owner,
                household_id,
                role: Role::Viewer,
                joined_at: Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }

    #[test]
    fn removing_household_cascades() {
        let (dir, owner, household_id, kitchen_id) = seeded();
        let removed = dir.remove_household(household_id).unwrap();

        assert_eq!(removed, vec![kitchen_id]);
        assert_eq!(dir.kitchen_household(kitchen_id).unwrap(), None);
        assert_eq!(dir.membership(owner, household_id).unwrap(), None);
    }

    #[test]
    fn kitchen_requires_existing_household() {
        let dir = InMemoryDirectory::new();
        let kitchen = Kitchen::new(KitchenId::new(), HouseholdId::new(), "Office", KitchenKind::Office).unwrap();
        assert!(matches!(
            dir.insert_kitchen(kitchen),
            Err(ServiceError::Domain(DomainError::NotFound("household")))
        ));
    }
}
