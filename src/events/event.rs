use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::teams::{InvitationKind, Role};

/// Team events emitted by the gateway after a transaction commits.
///
/// Each gateway publishes these on its own [`EventBus`](super::EventBus).
#[derive(Debug, Clone)]
pub enum TeamEvent {
    // teams
    TeamCreated {
        team_id: Uuid,
        slug: Option<String>,
        created_by: Uuid,
        at: DateTime<Utc>,
    },
    TeamUpdated {
        team_id: Uuid,
        updated_by: Uuid,
        at: DateTime<Utc>,
    },

    // membership
    MemberRoleChanged {
        team_id: Uuid,
        user_identity: Uuid,
        role: Role,
        changed_by: Uuid,
        at: DateTime<Utc>,
    },
    PrimaryOwnerTransferred {
        team_id: Uuid,
        from: Uuid,
        to: Uuid,
        at: DateTime<Utc>,
    },
    MemberRemoved {
        team_id: Uuid,
        user_identity: Uuid,
        removed_by: Uuid,
        at: DateTime<Utc>,
    },

    // invitations
    InvitationCreated {
        invitation_id: Uuid,
        team_id: Uuid,
        role: Role,
        kind: InvitationKind,
        invited_by: Uuid,
        at: DateTime<Utc>,
    },
    InvitationAccepted {
        invitation_id: Uuid,
        team_id: Uuid,
        user_identity: Uuid,
        role: Role,
        at: DateTime<Utc>,
    },
    InvitationRevoked {
        invitation_id: Uuid,
        team_id: Uuid,
        revoked_by: Uuid,
        at: DateTime<Utc>,
    },
}

impl TeamEvent {
    /// Returns a dot-separated event name for logging/tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TeamCreated { .. } => "team.created",
            Self::TeamUpdated { .. } => "team.updated",
            Self::MemberRoleChanged { .. } => "team.member.role_changed",
            Self::PrimaryOwnerTransferred { .. } => "team.owner.transferred",
            Self::MemberRemoved { .. } => "team.member.removed",
            Self::InvitationCreated { .. } => "team.invitation.created",
            Self::InvitationAccepted { .. } => "team.invitation.accepted",
            Self::InvitationRevoked { .. } => "team.invitation.revoked",
        }
    }

    pub fn team_id(&self) -> Uuid {
        match self {
            Self::TeamCreated { team_id, .. }
            | Self::TeamUpdated { team_id, .. }
            | Self::MemberRoleChanged { team_id, .. }
            | Self::PrimaryOwnerTransferred { team_id, .. }
            | Self::MemberRemoved { team_id, .. }
            | Self::InvitationCreated { team_id, .. }
            | Self::InvitationAccepted { team_id, .. }
            | Self::InvitationRevoked { team_id, .. } => *team_id,
        }
    }

    /// The identity whose call produced the event. For a transfer this is
    /// the outgoing primary owner; for an accepted invitation, the joiner.
    pub fn actor(&self) -> Uuid {
        match self {
            Self::TeamCreated { created_by, .. } => *created_by,
            Self::TeamUpdated { updated_by, .. } => *updated_by,
            Self::MemberRoleChanged { changed_by, .. } => *changed_by,
            Self::PrimaryOwnerTransferred { from, .. } => *from,
            Self::MemberRemoved { removed_by, .. } => *removed_by,
            Self::InvitationCreated { invited_by, .. } => *invited_by,
            Self::InvitationAccepted { user_identity, .. } => *user_identity,
            Self::InvitationRevoked { revoked_by, .. } => *revoked_by,
        }
    }

    /// The member or invitation the event is about, if not the team itself.
    pub fn subject(&self) -> Option<Uuid> {
        match self {
            Self::TeamCreated { .. } | Self::TeamUpdated { .. } => None,
            Self::MemberRoleChanged { user_identity, .. }
            | Self::MemberRemoved { user_identity, .. } => Some(*user_identity),
            Self::PrimaryOwnerTransferred { to, .. } => Some(*to),
            Self::InvitationCreated { invitation_id, .. }
            | Self::InvitationAccepted { invitation_id, .. }
            | Self::InvitationRevoked { invitation_id, .. } => Some(*invitation_id),
        }
    }

    /// Events that change who controls the team: a primary owner hand-over,
    /// a grant of the owner role, or a removal.
    pub fn affects_control(&self) -> bool {
        match self {
            Self::PrimaryOwnerTransferred { .. } | Self::MemberRemoved { .. } => true,
            Self::MemberRoleChanged { role, .. } | Self::InvitationAccepted { role, .. } => {
                *role == Role::Owner
            }
            _ => false,
        }
    }

    /// Returns the timestamp when this event occurred.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::TeamCreated { at, .. }
            | Self::TeamUpdated { at, .. }
            | Self::MemberRoleChanged { at, .. }
            | Self::PrimaryOwnerTransferred { at, .. }
            | Self::MemberRemoved { at, .. }
            | Self::InvitationCreated { at, .. }
            | Self::InvitationAccepted { at, .. }
            | Self::InvitationRevoked { at, .. } => *at,
        }
    }
}
