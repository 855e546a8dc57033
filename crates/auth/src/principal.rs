use serde::{Deserialize, Serialize};

pub use larder_core::PrincipalId;

/// The identity performing a request.
///
/// Roles are not carried here: they are resolved per household through a
/// `MembershipLookup` at check time, so a stale token never grants a role the
/// principal no longer holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub principal_id: PrincipalId,
}

impl Principal {
    pub fn new(principal_id: PrincipalId) -> Self {
        Self { principal_id }
    }

    pub fn id(&self) -> PrincipalId {
        self.principal_id
    }
}
