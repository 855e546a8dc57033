// ─────────────────────────────────────────────────────────────────────────────
// Access Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

use serde::Serialize;

use larder_core::{HouseholdId, KitchenId};

use crate::{
    AccessError, Authorized, DenialReason, KitchenLookup, MembershipLookup, Principal, PrincipalId,
    Role, check_access,
};

/// Detailed, serializable explanation of one access decision.
///
/// This is for operators and audit views. It names roles and the reason for a
/// denial, so it must never be returned to the denied caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessExplanation {
    pub principal_id: PrincipalId,
    pub kitchen_id: KitchenId,
    pub household_id: Option<HouseholdId>,
    pub required_role: Role,
    pub actual_role: Option<Role>,
    pub granted: bool,
    pub reason: String,
    pub denial: Option<DenialKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    KitchenNotFound,
    NotMember,
    InsufficientRole,
    LookupFailed,
}

/// Run the access check and describe the outcome.
pub fn explain_access<K, M>(
    kitchens: &K,
    memberships: &M,
    principal: &Principal,
    kitchen_id: KitchenId,
    required: Role,
) -> AccessExplanation
where
    K: KitchenLookup + ?Sized,
    M: MembershipLookup + ?Sized,
{
    let outcome = check_access(kitchens, memberships, principal, kitchen_id, required);
    AccessExplanation::from_outcome(principal.principal_id, kitchen_id, required, &outcome)
}

impl AccessExplanation {
    pub fn from_outcome(
        principal_id: PrincipalId,
        kitchen_id: KitchenId,
        required: Role,
        outcome: &Result<Authorized, AccessError>,
    ) -> Self {
        let base = Self {
            principal_id,
            kitchen_id,
            household_id: None,
            required_role: required,
            actual_role: None,
            granted: false,
            reason: String::new(),
            denial: None,
        };

        match outcome {
            Ok(auth) => Self {
                household_id: Some(auth.household_id),
                actual_role: Some(auth.role),
                granted: true,
                reason: if auth.role == required {
                    format!("Principal holds exactly the required role {required}")
                } else {
                    format!("Principal holds {} which outranks {required}", auth.role)
                },
                ..base
            },
            Err(AccessError::NotFound(_)) => Self {
                reason: format!("Kitchen {kitchen_id} does not exist"),
                denial: Some(DenialKind::KitchenNotFound),
                ..base
            },
            Err(AccessError::Denied(DenialReason::NotMember)) => Self {
                reason: "Principal has no membership in the household owning this kitchen"
                    .to_string(),
                denial: Some(DenialKind::NotMember),
                ..base
            },
            Err(AccessError::Denied(DenialReason::InsufficientRole { required, actual })) => {
                Self {
                    actual_role: Some(*actual),
                    reason: format!("Principal holds {actual} but {required} is required"),
                    denial: Some(DenialKind::InsufficientRole),
                    ..base
                }
            }
            Err(AccessError::Lookup(e)) => Self {
                reason: format!("Decision could not be made: {e}"),
                denial: Some(DenialKind::LookupFailed),
                ..base
            },
        }
    }
}
