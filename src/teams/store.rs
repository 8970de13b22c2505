//! Storage seam for the access core.
//!
//! Every gateway operation runs against one [`TeamTransaction`]. Changes
//! become visible to other transactions only after [`TeamTransaction::commit`];
//! dropping a transaction without committing discards them.
//!
//! Implementations must enforce the uniqueness rules themselves:
//! `teams.slug` (when present), `(team_id, user_identity)` on memberships and
//! `token_hash` on invitations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::types::{InvitationKind, Team, TeamInvitation, TeamMembership};
use super::Role;
use crate::AccessError;

#[derive(Debug, Clone)]
pub struct CreateTeam {
    pub id: Uuid,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub primary_owner_identity: Uuid,
    pub public_metadata: Value,
    pub private_metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateMembership {
    pub team_id: Uuid,
    pub user_identity: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub id: Uuid,
    pub team_id: Uuid,
    pub role: Role,
    pub token_hash: String,
    pub invited_by_identity: Uuid,
    pub team_name_snapshot: Option<String>,
    pub kind: InvitationKind,
    pub created_at: DateTime<Utc>,
}

/// Page of a team's invitations, newest first.
#[derive(Debug, Clone)]
pub struct InvitationPage {
    pub team_id: Uuid,
    /// Exclusive lower bound on `created_at`. Callers fold the expiry
    /// cutoff into this.
    pub created_after: DateTime<Utc>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u32,
}

/// Opens transactions against the shared team state.
#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn TeamTransaction>, AccessError>;
}

/// One atomic unit of work.
///
/// Reads observe the transaction's own earlier writes.
#[async_trait]
pub trait TeamTransaction: Send {
    /// Fails with [`AccessError::Conflict`] if the slug is taken.
    async fn insert_team(&mut self, data: CreateTeam) -> Result<Team, AccessError>;
    async fn find_team(&mut self, id: Uuid) -> Result<Option<Team>, AccessError>;
    async fn find_team_by_slug(&mut self, slug: &str) -> Result<Option<Team>, AccessError>;

    /// Writes the mutable columns of `team` (name, slug, metadata, update
    /// stamps). Never writes `id` or `primary_owner_identity`.
    ///
    /// Fails with [`AccessError::Conflict`] if the new slug is taken.
    async fn update_team(&mut self, team: &Team) -> Result<Team, AccessError>;

    /// Compare-and-set on the primary owner. Returns `false`, changing
    /// nothing, if the current primary owner is not `expected`.
    async fn set_primary_owner(
        &mut self,
        team_id: Uuid,
        expected: Uuid,
        new_owner: Uuid,
        updated_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, AccessError>;

    async fn find_membership(
        &mut self,
        team_id: Uuid,
        user_identity: Uuid,
    ) -> Result<Option<TeamMembership>, AccessError>;
    async fn memberships_for_user(
        &mut self,
        user_identity: Uuid,
    ) -> Result<Vec<TeamMembership>, AccessError>;
    async fn memberships_for_team(
        &mut self,
        team_id: Uuid,
    ) -> Result<Vec<TeamMembership>, AccessError>;

    /// Fails with [`AccessError::AlreadyMember`] if the row exists.
    async fn insert_membership(
        &mut self,
        data: CreateMembership,
    ) -> Result<TeamMembership, AccessError>;

    /// Inserts the row, or sets the role of the existing one.
    async fn upsert_membership(
        &mut self,
        data: CreateMembership,
    ) -> Result<TeamMembership, AccessError>;

    /// Deletes the row unless `user_identity` is the team's primary owner.
    /// The primary-owner check is part of the delete itself. Returns whether
    /// a row was deleted.
    async fn delete_membership(
        &mut self,
        team_id: Uuid,
        user_identity: Uuid,
    ) -> Result<bool, AccessError>;

    /// Fails with [`AccessError::Conflict`] on a token hash collision.
    async fn insert_invitation(
        &mut self,
        data: CreateInvitation,
    ) -> Result<TeamInvitation, AccessError>;
    async fn find_invitation(&mut self, id: Uuid) -> Result<Option<TeamInvitation>, AccessError>;
    async fn find_invitation_by_token_hash(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<TeamInvitation>, AccessError>;
    async fn list_invitations(
        &mut self,
        page: InvitationPage,
    ) -> Result<Vec<TeamInvitation>, AccessError>;

    /// Returns whether a row was deleted.
    async fn delete_invitation(&mut self, id: Uuid) -> Result<bool, AccessError>;

    async fn commit(self: Box<Self>) -> Result<(), AccessError>;
}
