//! Team roles and their ordering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role a member holds on a team.
///
/// Roles are ordered, `Owner` outranks `Member`. Membership checks made by
/// the access layer compare roles exactly; use [`Role::sufficient`] when a
/// hierarchical comparison is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Member,
}

impl Role {
    /// Ordinal used for comparing roles. Higher outranks lower.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Owner => 2,
            Self::Member => 1,
        }
    }

    /// Returns true if `have` ranks at least as high as `want`.
    pub const fn sufficient(have: Self, want: Self) -> bool {
        have.rank() >= want.rank()
    }

    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "member" => Ok(Self::Member),
            other => Err(crate::AccessError::Internal(format!(
                "unknown role `{other}`"
            ))),
        }
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}
