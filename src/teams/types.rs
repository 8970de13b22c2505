//! Core records for teams, memberships and invitations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::Role;
use crate::{AccessError, SecretString};

/// A team: the unit every membership and invitation is scoped to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Immutable identifier.
    pub id: Uuid,
    /// The one identity accountable for the team. Changed only by an
    /// ownership transfer.
    pub primary_owner_identity: Uuid,
    pub name: Option<String>,
    /// Normalized, unique when present.
    pub slug: Option<String>,
    /// Only writable by a service caller.
    pub private_metadata: Value,
    pub public_metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
}

/// One user's role on one team. Unique per `(team_id, user_identity)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembership {
    pub team_id: Uuid,
    pub user_identity: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How an invitation behaves once accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationKind {
    /// Deleted by the first successful acceptance.
    SingleUse,
    /// Accepted by any number of identities until it ages out.
    TimeLimited,
}

impl InvitationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleUse => "single_use",
            Self::TimeLimited => "time_limited",
        }
    }
}

impl fmt::Display for InvitationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationKind {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_use" => Ok(Self::SingleUse),
            "time_limited" => Ok(Self::TimeLimited),
            other => Err(AccessError::Internal(format!(
                "unknown invitation kind `{other}`"
            ))),
        }
    }
}

/// A stored invitation. The plain token is never kept, only its hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamInvitation {
    pub id: Uuid,
    pub team_id: Uuid,
    /// Role granted on acceptance.
    pub role: Role,
    /// SHA-256 hash of the invitation token.
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub invited_by_identity: Uuid,
    /// Team name at the time the invitation was created.
    pub team_name_snapshot: Option<String>,
    pub kind: InvitationKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamInvitation {
    /// Oldest `created_at` still considered active at `now`.
    pub fn active_since(now: DateTime<Utc>, lifetime: Duration) -> DateTime<Utc> {
        now - lifetime
    }

    /// Check if the invitation can still be looked up or accepted.
    pub fn is_active(&self, now: DateTime<Utc>, lifetime: Duration) -> bool {
        self.created_at > Self::active_since(now, lifetime)
    }
}

/// A team as seen from one of its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team_id: Uuid,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub role: Role,
    pub is_primary_owner: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A member as listed to other members of the same team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_identity: Uuid,
    pub role: Role,
    pub is_primary_owner: bool,
}

/// A user's standing on a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub role: Role,
    pub is_primary_owner: bool,
}

/// An invitation as listed to team owners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationSummary {
    pub invitation_id: Uuid,
    pub team_id: Uuid,
    pub role: Role,
    pub kind: InvitationKind,
    pub invited_by_identity: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&TeamInvitation> for InvitationSummary {
    fn from(invitation: &TeamInvitation) -> Self {
        Self {
            invitation_id: invitation.id,
            team_id: invitation.team_id,
            role: invitation.role,
            kind: invitation.kind,
            invited_by_identity: invitation.invited_by_identity,
            created_at: invitation.created_at,
        }
    }
}

/// Result of creating an invitation. `token` is the only copy of the plain
/// token and must be delivered to the invitee by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedInvitation {
    pub invitation: InvitationSummary,
    pub token: SecretString,
}

/// Public answer to "is this token still good?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationLookup {
    pub active: bool,
    pub team_name: Option<String>,
}

impl InvitationLookup {
    pub fn inactive() -> Self {
        Self {
            active: false,
            team_name: None,
        }
    }
}

/// Result of a successful invitation acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedInvitation {
    pub team_id: Uuid,
    pub role: Role,
    pub slug: Option<String>,
}

/// Input for creating a team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTeamInput {
    pub name: Option<String>,
    /// Normalized before use. Derived from `name` when absent.
    pub slug: Option<String>,
}

impl CreateTeamInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            slug: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

/// Requested changes to a team.
///
/// `id` and `primary_owner_identity` exist so that attempts to change them
/// can be rejected with [`AccessError::ProtectedField`]; setting them to
/// their current value is a no-op.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub public_metadata: Option<Value>,
    /// Replace `public_metadata` instead of shallow-merging into it.
    #[serde(default)]
    pub replace_metadata: bool,
    pub private_metadata: Option<Value>,
    pub id: Option<Uuid>,
    pub primary_owner_identity: Option<Uuid>,
}

/// Filters for listing a team's invitations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvitationQuery {
    /// Defaults to the configured page size (25).
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
    /// Only invitations created strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Only invitations created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,
}
