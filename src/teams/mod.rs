//! Teams, memberships, ownership and invitations.
//!
//! Each submodule is one component of the access core. Their functions take
//! an open [`TeamTransaction`] and an explicit [`Caller`](crate::Caller);
//! [`AccessGateway`](crate::AccessGateway) owns the transaction boundaries.

mod authorizer;
pub mod directory;
pub mod invitations;
pub mod membership;
pub mod ownership;
mod role;
mod slug;
mod store;
mod types;

pub use authorizer::Authorizer;
pub use ownership::RoleChange;
pub use role::Role;
pub use slug::normalize_slug;
pub use store::{
    CreateInvitation, CreateMembership, CreateTeam, InvitationPage, TeamStore, TeamTransaction,
};
pub use types::{
    AcceptedInvitation, CreateTeamInput, CreatedInvitation, InvitationKind, InvitationLookup,
    InvitationQuery, InvitationSummary, RoleInfo, Team, TeamInvitation, TeamMember,
    TeamMembership, TeamSummary, TeamUpdate,
};
