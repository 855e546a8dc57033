//! `larder-auth`: kitchen access control.
//!
//! Pure authorization boundary: a total role order, the records that link
//! principals to households and kitchens, and the guard every kitchen-scoped
//! operation runs before touching data. Storage sits behind the lookup traits.

pub mod authorize;
pub mod claims;
pub mod explain;
pub mod household;
pub mod lookup;
pub mod operations;
pub mod principal;
pub mod roles;

pub use authorize::{
    AccessError, AccessGuard, Authorized, DenialReason, check_access, check_household_access,
};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use explain::{AccessExplanation, DenialKind, explain_access};
pub use household::{Household, Kitchen, KitchenKind, Membership};
pub use lookup::{KitchenLookup, LookupError, MembershipLookup};
pub use operations::{HouseholdOperation, KitchenOperation};
pub use principal::{Principal, PrincipalId};
pub use roles::Role;
