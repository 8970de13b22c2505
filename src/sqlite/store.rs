//! [`TeamStore`] over a `sqlx` `SQLite` pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::teams::{database_error, invitation, membership, team};
use crate::AccessError;
use crate::teams::{
    CreateInvitation, CreateMembership, CreateTeam, InvitationPage, Team, TeamInvitation,
    TeamMembership, TeamStore, TeamTransaction,
};

const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";

/// `SQLite`-backed team store. Each [`TeamStore::begin`] opens a
/// `sqlx::Transaction` on the pool with `BEGIN IMMEDIATE`, so the write lock
/// is taken before the first read and concurrent transactions queue on the
/// connection's busy timeout instead of failing at their first write.
#[derive(Clone)]
pub struct SqliteTeamStore {
    pool: SqlitePool,
}

impl SqliteTeamStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TeamStore for SqliteTeamStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn begin(&self) -> Result<Box<dyn TeamTransaction>, AccessError> {
        let tx = self
            .pool
            .begin_with(BEGIN_IMMEDIATE)
            .await
            .map_err(|e| database_error("begin", &e))?;

        Ok(Box::new(SqliteTeamTransaction { tx }))
    }
}

struct SqliteTeamTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl TeamTransaction for SqliteTeamTransaction {
    async fn insert_team(&mut self, data: CreateTeam) -> Result<Team, AccessError> {
        team::insert(&mut self.tx, data).await
    }

    async fn find_team(&mut self, id: Uuid) -> Result<Option<Team>, AccessError> {
        team::find(&mut self.tx, id).await
    }

    async fn find_team_by_slug(&mut self, slug: &str) -> Result<Option<Team>, AccessError> {
        team::find_by_slug(&mut self.tx, slug).await
    }

    async fn update_team(&mut self, data: &Team) -> Result<Team, AccessError> {
        team::update(&mut self.tx, data).await
    }

    async fn set_primary_owner(
        &mut self,
        team_id: Uuid,
        expected: Uuid,
        new_owner: Uuid,
        updated_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, AccessError> {
        team::set_primary_owner(&mut self.tx, team_id, expected, new_owner, updated_by, at).await
    }

    async fn find_membership(
        &mut self,
        team_id: Uuid,
        user_identity: Uuid,
    ) -> Result<Option<TeamMembership>, AccessError> {
        membership::find(&mut self.tx, team_id, user_identity).await
    }

    async fn memberships_for_user(
        &mut self,
        user_identity: Uuid,
    ) -> Result<Vec<TeamMembership>, AccessError> {
        membership::for_user(&mut self.tx, user_identity).await
    }

    async fn memberships_for_team(
        &mut self,
        team_id: Uuid,
    ) -> Result<Vec<TeamMembership>, AccessError> {
        membership::for_team(&mut self.tx, team_id).await
    }

    async fn insert_membership(
        &mut self,
        data: CreateMembership,
    ) -> Result<TeamMembership, AccessError> {
        membership::insert(&mut self.tx, data).await
    }

    async fn upsert_membership(
        &mut self,
        data: CreateMembership,
    ) -> Result<TeamMembership, AccessError> {
        membership::upsert(&mut self.tx, data).await
    }

    async fn delete_membership(
        &mut self,
        team_id: Uuid,
        user_identity: Uuid,
    ) -> Result<bool, AccessError> {
        membership::delete_unless_primary(&mut self.tx, team_id, user_identity).await
    }

    async fn insert_invitation(
        &mut self,
        data: CreateInvitation,
    ) -> Result<TeamInvitation, AccessError> {
        invitation::insert(&mut self.tx, data).await
    }

    async fn find_invitation(&mut self, id: Uuid) -> Result<Option<TeamInvitation>, AccessError> {
        invitation::find(&mut self.tx, id).await
    }

    async fn find_invitation_by_token_hash(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<TeamInvitation>, AccessError> {
        invitation::find_by_token_hash(&mut self.tx, token_hash).await
    }

    async fn list_invitations(
        &mut self,
        page: InvitationPage,
    ) -> Result<Vec<TeamInvitation>, AccessError> {
        invitation::list(&mut self.tx, page).await
    }

    async fn delete_invitation(&mut self, id: Uuid) -> Result<bool, AccessError> {
        invitation::delete(&mut self.tx, id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AccessError> {
        let Self { tx } = *self;
        tx.commit().await.map_err(|e| database_error("commit", &e))
    }
}
