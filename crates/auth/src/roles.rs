use core::str::FromStr;

use serde::{Deserialize, Serialize};

use larder_core::DomainError;

/// Role a principal holds within a household.
///
/// Variants are declared lowest to highest; the derived `Ord` is the
/// privilege order used by every "at least" comparison.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Viewer,
    Member,
    Admin,
    Owner,
}

impl Role {
    /// All roles, lowest privilege first.
    pub const ALL: [Role; 4] = [Role::Viewer, Role::Member, Role::Admin, Role::Owner];

    /// Whether a holder of `self` meets a `required` minimum.
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "VIEWER",
            Role::Member => "MEMBER",
            Role::Admin => "ADMIN",
            Role::Owner => "OWNER",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VIEWER" => Ok(Role::Viewer),
            "MEMBER" => Ok(Role::Member),
            "ADMIN" => Ok(Role::Admin),
            "OWNER" => Ok(Role::Owner),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
