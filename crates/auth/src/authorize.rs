//! The kitchen access guard.
//!
//! Every kitchen-scoped operation resolves the owning household, resolves the
//! caller's membership there, and compares roles, in that order, before it
//! reads or writes anything.

use serde::Serialize;
use thiserror::Error;

use larder_core::{HouseholdId, KitchenId};

use crate::{
    HouseholdOperation, KitchenLookup, KitchenOperation, LookupError, MembershipLookup, Principal,
    PrincipalId, Role,
};

/// Why a resolved principal was refused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DenialReason {
    /// No membership in the household owning the kitchen.
    NotMember,
    /// A membership exists but its role is below the required minimum.
    InsufficientRole { required: Role, actual: Role },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("kitchen {0} not found")]
    NotFound(KitchenId),

    #[error("access denied: {0:?}")]
    Denied(DenialReason),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl AccessError {
    /// Message safe to show the caller.
    ///
    /// A missing kitchen and a refused principal read the same, so the
    /// response reveals neither kitchen existence nor role structure.
    pub fn public_message(&self) -> &'static str {
        match self {
            AccessError::NotFound(_) | AccessError::Denied(_) => "access denied",
            AccessError::Lookup(_) => "service unavailable",
        }
    }

    /// Whether callers should treat this as an authorization failure.
    pub fn is_denial(&self) -> bool {
        matches!(self, AccessError::NotFound(_) | AccessError::Denied(_))
    }
}

/// Proof that a check passed, carrying what it resolved.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub principal_id: PrincipalId,
    pub household_id: HouseholdId,
    pub kitchen_id: Option<KitchenId>,
    pub role: Role,
}

/// Check that `principal` holds at least `minimum` in the household owning
/// `kitchen_id`.
///
/// - No mutation
/// - No retries (lookup failures propagate as `AccessError::Lookup`)
/// - No panics
pub fn check_access<K, M>(
    kitchens: &K,
    memberships: &M,
    principal: &Principal,
    kitchen_id: KitchenId,
    minimum: Role,
) -> Result<Authorized, AccessError>
where
    K: KitchenLookup + ?Sized,
    M: MembershipLookup + ?Sized,
{
    let household_id = match kitchens.kitchen_household(kitchen_id)? {
        Some(household_id) => household_id,
        None => {
            tracing::warn!(
                principal_id = %principal.principal_id,
                kitchen_id = %kitchen_id,
                "access check against unknown kitchen"
            );
            return Err(AccessError::NotFound(kitchen_id));
        }
    };

    let mut authorized = check_household_access(memberships, principal, household_id, minimum)?;
    authorized.kitchen_id = Some(kitchen_id);
    Ok(authorized)
}

/// Membership and role steps of the check, for operations that name a
/// household directly (e.g. deleting it).
pub fn check_household_access<M>(
    memberships: &M,
    principal: &Principal,
    household_id: HouseholdId,
    minimum: Role,
) -> Result<Authorized, AccessError>
where
    M: MembershipLookup + ?Sized,
{
    let Some(membership) = memberships.membership(principal.principal_id, household_id)? else {
        tracing::warn!(
            principal_id = %principal.principal_id,
            household_id = %household_id,
            required = %minimum,
            "access denied: not a member"
        );
        return Err(AccessError::Denied(DenialReason::NotMember));
    };

    if !membership.role.satisfies(minimum) {
        tracing::warn!(
            principal_id = %principal.principal_id,
            household_id = %household_id,
            required = %minimum,
            actual = %membership.role,
            "access denied: insufficient role"
        );
        return Err(AccessError::Denied(DenialReason::InsufficientRole {
            required: minimum,
            actual: membership.role,
        }));
    }

    tracing::debug!(
        principal_id = %principal.principal_id,
        household_id = %household_id,
        role = %membership.role,
        "access granted"
    );

    Ok(Authorized {
        principal_id: principal.principal_id,
        household_id,
        kitchen_id: None,
        role: membership.role,
    })
}

/// Guard bundling the two lookups, invoked at the top of every kitchen
/// operation.
#[derive(Debug, Clone)]
pub struct AccessGuard<K, M> {
    kitchens: K,
    memberships: M,
}

impl<K, M> AccessGuard<K, M>
where
    K: KitchenLookup,
    M: MembershipLookup,
{
    pub fn new(kitchens: K, memberships: M) -> Self {
        Self {
            kitchens,
            memberships,
        }
    }

    pub fn check(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        minimum: Role,
    ) -> Result<Authorized, AccessError> {
        check_access(&self.kitchens, &self.memberships, principal, kitchen_id, minimum)
    }

    pub fn check_operation(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        operation: KitchenOperation,
    ) -> Result<Authorized, AccessError> {
        tracing::trace!(operation = operation.name(), kitchen_id = %kitchen_id, "checking access");
        self.check(principal, kitchen_id, operation.minimum_role())
    }

    pub fn check_household_operation(
        &self,
        principal: &Principal,
        household_id: HouseholdId,
        operation: HouseholdOperation,
    ) -> Result<Authorized, AccessError> {
        tracing::trace!(operation = operation.name(), household_id = %household_id, "checking access");
        check_household_access(
            &self.memberships,
            principal,
            household_id,
            operation.minimum_role(),
        )
    }

    /// Run `f` only after `operation`'s access check passes.
    ///
    /// On denial `f` is never invoked.
    pub fn guarded<T, E, F>(
        &self,
        principal: &Principal,
        kitchen_id: KitchenId,
        operation: KitchenOperation,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&Authorized) -> Result<T, E>,
        E: From<AccessError>,
    {
        let authorized = self.check_operation(principal, kitchen_id, operation)?;
        f(&authorized)
    }

    pub fn kitchens(&self) -> &K {
        &self.kitchens
    }

    pub fn memberships(&self) -> &M {
        &self.memberships
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;

    use chrono::Utc;
    use proptest::prelude::*;

    use super::*;
    use crate::Membership;

    #[derive(Default)]
    struct FakeDirectory {
        kitchens: HashMap<KitchenId, HouseholdId>,
        memberships: HashMap<(PrincipalId, HouseholdId), Role>,
        unavailable: bool,
    }

    impl FakeDirectory {
        fn with_member(role: Role) -> (Self, Principal, KitchenId) {
            let mut dir = FakeDirectory::default();
            let household = HouseholdId::new();
            let kitchen = KitchenId::new();
            let principal = Principal::new(PrincipalId::new());
            dir.kitchens.insert(kitchen, household);
            dir.memberships.insert((principal.principal_id, household), role);
            (dir, principal, kitchen)
        }
    }

    impl KitchenLookup for FakeDirectory {
        fn kitchen_household(
            &self,
            kitchen_id: KitchenId,
        ) -> Result<Option<HouseholdId>, LookupError> {
            if self.unavailable {
                return Err(LookupError::Unavailable("down".to_string()));
            }
            Ok(self.kitchens.get(&kitchen_id).copied())
        }
    }

    impl MembershipLookup for FakeDirectory {
        fn membership(
            &self,
            principal_id: PrincipalId,
            household_id: HouseholdId,
        ) -> Result<Option<Membership>, LookupError> {
            Ok(self
                .memberships
                .get(&(principal_id, household_id))
                .map(|role| Membership {
                    principal_id,
                    household_id,
                    role: *role,
                    joined_at: Utc::now(),
                }))
        }
    }

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    #[test]
    fn member_cannot_act_as_admin() {
        let (dir, principal, kitchen) = FakeDirectory::with_member(Role::Member);
        let err = check_access(&dir, &dir, &principal, kitchen, Role::Admin).unwrap_err();
        assert_eq!(
            err,
            AccessError::Denied(DenialReason::InsufficientRole {
                required: Role::Admin,
                actual: Role::Member,
            })
        );
    }

    #[test]
    fn owner_can_act_as_member() {
        let (dir, principal, kitchen) = FakeDirectory::with_member(Role::Owner);
        let authorized = check_access(&dir, &dir, &principal, kitchen, Role::Member).unwrap();
        assert_eq!(authorized.role, Role::Owner);
        assert_eq!(authorized.kitchen_id, Some(kitchen));
        assert_eq!(authorized.principal_id, principal.principal_id);
    }

    #[test]
    fn unknown_kitchen_is_not_found_but_reads_as_denied() {
        let (dir, principal, _) = FakeDirectory::with_member(Role::Owner);
        let missing = KitchenId::new();
        let err = check_access(&dir, &dir, &principal, missing, Role::Viewer).unwrap_err();
        assert_eq!(err, AccessError::NotFound(missing));
        assert!(err.is_denial());
        assert_eq!(
            err.public_message(),
            AccessError::Denied(DenialReason::NotMember).public_message()
        );
    }

    #[test]
    fn lookup_failures_propagate_unmasked() {
        let (mut dir, principal, kitchen) = FakeDirectory::with_member(Role::Owner);
        dir.unavailable = true;
        let err = check_access(&dir, &dir, &principal, kitchen, Role::Viewer).unwrap_err();
        assert!(matches!(err, AccessError::Lookup(LookupError::Unavailable(_))));
        assert!(!err.is_denial());
    }

    #[test]
    fn guarded_skips_the_body_on_denial() {
        let (dir, principal, kitchen) = FakeDirectory::with_member(Role::Viewer);
        let guard = AccessGuard::new(dir, FakeDirectory::default());
        let ran = Cell::new(false);

        // Membership lives in the first directory only, so the second one denies.
        let result: Result<(), AccessError> =
            guard.guarded(&principal, kitchen, KitchenOperation::ListInventory, |_| {
                ran.set(true);
                Ok(())
            });

        assert_eq!(result, Err(AccessError::Denied(DenialReason::NotMember)));
        assert!(!ran.get());
    }

    #[test]
    fn guarded_runs_the_body_once_granted() {
        let (dir, principal, kitchen) = FakeDirectory::with_member(Role::Member);
        let dir = std::sync::Arc::new(dir);
        let guard = AccessGuard::new(dir.clone(), dir);

        let value: Result<Role, AccessError> =
            guard.guarded(&principal, kitchen, KitchenOperation::CreateBatch, |auth| {
                Ok(auth.role)
            });
        assert_eq!(value, Ok(Role::Member));
    }

    #[test]
    fn household_delete_requires_owner() {
        let (dir, principal, kitchen) = FakeDirectory::with_member(Role::Admin);
        let household = dir.kitchens[&kitchen];
        let dir = std::sync::Arc::new(dir);
        let guard = AccessGuard::new(dir.clone(), dir);

        let err = guard
            .check_household_operation(&principal, household, HouseholdOperation::Delete)
            .unwrap_err();
        assert!(matches!(
            err,
            AccessError::Denied(DenialReason::InsufficientRole { required: Role::Owner, .. })
        ));
        assert!(
            guard
                .check_household_operation(&principal, household, HouseholdOperation::InviteMember)
                .is_ok()
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a grant at a higher minimum implies a grant at every lower one.
        #[test]
        fn grants_are_monotonic(held in role_strategy(), r1 in role_strategy(), r2 in role_strategy()) {
            let (high, low) = if r1 >= r2 { (r1, r2) } else { (r2, r1) };
            let (dir, principal, kitchen) = FakeDirectory::with_member(held);

            if check_access(&dir, &dir, &principal, kitchen, high).is_ok() {
                prop_assert!(check_access(&dir, &dir, &principal, kitchen, low).is_ok());
            }
        }

        /// Property: non-members are denied for every minimum role.
        #[test]
        fn non_members_are_always_denied(held in role_strategy(), required in role_strategy()) {
            let (dir, _member, kitchen) = FakeDirectory::with_member(held);
            let outsider = Principal::new(PrincipalId::new());

            let result = check_access(&dir, &dir, &outsider, kitchen, required);
            prop_assert_eq!(result, Err(AccessError::Denied(DenialReason::NotMember)));
        }

        /// Property: the decision is exactly the role comparison.
        #[test]
        fn decision_matches_role_order(held in role_strategy(), required in role_strategy()) {
            let (dir, principal, kitchen) = FakeDirectory::with_member(held);
            let granted = check_access(&dir, &dir, &principal, kitchen, required).is_ok();
            prop_assert_eq!(granted, held >= required);
        }
    }
}
