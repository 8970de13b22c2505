//! In-process [`TeamStore`].
//!
//! Transactions are serialized by an async mutex held for the transaction's
//! whole lifetime. Each transaction works on a staged copy of the state that
//! replaces the shared state only on commit, so an error or a dropped
//! transaction leaves nothing behind.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::AccessError;
use crate::teams::{
    CreateInvitation, CreateMembership, CreateTeam, InvitationPage, Team, TeamInvitation,
    TeamMembership, TeamStore, TeamTransaction,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    teams: HashMap<Uuid, Team>,
    /// Keyed by `(team_id, user_identity)`.
    memberships: HashMap<(Uuid, Uuid), TeamMembership>,
    invitations: HashMap<Uuid, TeamInvitation>,
}

impl MemoryState {
    fn slug_taken(&self, slug: Option<&str>, except: Option<Uuid>) -> bool {
        slug.is_some_and(|slug| {
            self.teams
                .values()
                .any(|t| t.slug.as_deref() == Some(slug) && Some(t.id) != except)
        })
    }

    fn require_team(&self, team_id: Uuid) -> Result<(), AccessError> {
        if self.teams.contains_key(&team_id) {
            Ok(())
        } else {
            Err(AccessError::not_found("Team not found"))
        }
    }
}

/// Shared in-memory team state. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTeamStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTeamStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TeamStore for MemoryTeamStore {
    async fn begin(&self) -> Result<Box<dyn TeamTransaction>, AccessError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl TeamTransaction for MemoryTransaction {
    async fn insert_team(&mut self, data: CreateTeam) -> Result<Team, AccessError> {
        if self.staged.slug_taken(data.slug.as_deref(), None) {
            return Err(AccessError::Conflict(format!(
                "slug `{}` is already in use",
                data.slug.unwrap_or_default()
            )));
        }

        let team = Team {
            id: data.id,
            primary_owner_identity: data.primary_owner_identity,
            name: data.name,
            slug: data.slug,
            private_metadata: data.private_metadata,
            public_metadata: data.public_metadata,
            created_at: data.created_at,
            updated_at: data.created_at,
            created_by: data.primary_owner_identity,
            updated_by: data.primary_owner_identity,
        };
        self.staged.teams.insert(team.id, team.clone());

        Ok(team)
    }

    async fn find_team(&mut self, id: Uuid) -> Result<Option<Team>, AccessError> {
        Ok(self.staged.teams.get(&id).cloned())
    }

    async fn find_team_by_slug(&mut self, slug: &str) -> Result<Option<Team>, AccessError> {
        Ok(self
            .staged
            .teams
            .values()
            .find(|t| t.slug.as_deref() == Some(slug))
            .cloned())
    }

    async fn update_team(&mut self, team: &Team) -> Result<Team, AccessError> {
        if self.staged.slug_taken(team.slug.as_deref(), Some(team.id)) {
            return Err(AccessError::Conflict(format!(
                "slug `{}` is already in use",
                team.slug.as_deref().unwrap_or_default()
            )));
        }

        let stored = self
            .staged
            .teams
            .get_mut(&team.id)
            .ok_or_else(|| AccessError::not_found("Team not found"))?;

        stored.name.clone_from(&team.name);
        stored.slug.clone_from(&team.slug);
        stored.public_metadata.clone_from(&team.public_metadata);
        stored.private_metadata.clone_from(&team.private_metadata);
        stored.updated_at = team.updated_at;
        stored.updated_by = team.updated_by;

        Ok(stored.clone())
    }

    async fn set_primary_owner(
        &mut self,
        team_id: Uuid,
        expected: Uuid,
        new_owner: Uuid,
        updated_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, AccessError> {
        match self.staged.teams.get_mut(&team_id) {
            Some(team) if team.primary_owner_identity == expected => {
                team.primary_owner_identity = new_owner;
                team.updated_by = updated_by;
                team.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_membership(
        &mut self,
        team_id: Uuid,
        user_identity: Uuid,
    ) -> Result<Option<TeamMembership>, AccessError> {
        Ok(self
            .staged
            .memberships
            .get(&(team_id, user_identity))
            .cloned())
    }

    async fn memberships_for_user(
        &mut self,
        user_identity: Uuid,
    ) -> Result<Vec<TeamMembership>, AccessError> {
        let mut rows: Vec<TeamMembership> = self
            .staged
            .memberships
            .values()
            .filter(|m| m.user_identity == user_identity)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    async fn memberships_for_team(
        &mut self,
        team_id: Uuid,
    ) -> Result<Vec<TeamMembership>, AccessError> {
        let mut rows: Vec<TeamMembership> = self
            .staged
            .memberships
            .values()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    async fn insert_membership(
        &mut self,
        data: CreateMembership,
    ) -> Result<TeamMembership, AccessError> {
        self.staged.require_team(data.team_id)?;

        let key = (data.team_id, data.user_identity);
        if self.staged.memberships.contains_key(&key) {
            return Err(AccessError::AlreadyMember);
        }

        let membership = TeamMembership {
            team_id: data.team_id,
            user_identity: data.user_identity,
            role: data.role,
            created_at: data.created_at,
            updated_at: data.created_at,
        };
        self.staged.memberships.insert(key, membership.clone());

        Ok(membership)
    }

    async fn upsert_membership(
        &mut self,
        data: CreateMembership,
    ) -> Result<TeamMembership, AccessError> {
        self.staged.require_team(data.team_id)?;

        let membership = self
            .staged
            .memberships
            .entry((data.team_id, data.user_identity))
            .and_modify(|m| {
                m.role = data.role;
                m.updated_at = data.created_at;
            })
            .or_insert_with(|| TeamMembership {
                team_id: data.team_id,
                user_identity: data.user_identity,
                role: data.role,
                created_at: data.created_at,
                updated_at: data.created_at,
            });

        Ok(membership.clone())
    }

    async fn delete_membership(
        &mut self,
        team_id: Uuid,
        user_identity: Uuid,
    ) -> Result<bool, AccessError> {
        let is_primary = self
            .staged
            .teams
            .get(&team_id)
            .is_some_and(|t| t.primary_owner_identity == user_identity);
        if is_primary {
            return Ok(false);
        }

        Ok(self
            .staged
            .memberships
            .remove(&(team_id, user_identity))
            .is_some())
    }

    async fn insert_invitation(
        &mut self,
        data: CreateInvitation,
    ) -> Result<TeamInvitation, AccessError> {
        self.staged.require_team(data.team_id)?;

        if self
            .staged
            .invitations
            .values()
            .any(|i| i.token_hash == data.token_hash)
        {
            return Err(AccessError::Conflict("invitation token collision".to_owned()));
        }

        let invitation = TeamInvitation {
            id: data.id,
            team_id: data.team_id,
            role: data.role,
            token_hash: data.token_hash,
            invited_by_identity: data.invited_by_identity,
            team_name_snapshot: data.team_name_snapshot,
            kind: data.kind,
            created_at: data.created_at,
            updated_at: data.created_at,
        };
        self.staged
            .invitations
            .insert(invitation.id, invitation.clone());

        Ok(invitation)
    }

    async fn find_invitation(&mut self, id: Uuid) -> Result<Option<TeamInvitation>, AccessError> {
        Ok(self.staged.invitations.get(&id).cloned())
    }

    async fn find_invitation_by_token_hash(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<TeamInvitation>, AccessError> {
        Ok(self
            .staged
            .invitations
            .values()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn list_invitations(
        &mut self,
        page: InvitationPage,
    ) -> Result<Vec<TeamInvitation>, AccessError> {
        let mut rows: Vec<TeamInvitation> = self
            .staged
            .invitations
            .values()
            .filter(|i| i.team_id == page.team_id && i.created_at > page.created_after)
            .filter(|i| page.created_before.is_none_or(|before| i.created_at < before))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(rows
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn delete_invitation(&mut self, id: Uuid) -> Result<bool, AccessError> {
        Ok(self.staged.invitations.remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), AccessError> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::teams::Role;

    fn new_team(slug: &str) -> CreateTeam {
        CreateTeam {
            id: Uuid::new_v4(),
            name: Some("Team".to_owned()),
            slug: Some(slug.to_owned()),
            primary_owner_identity: Uuid::new_v4(),
            public_metadata: json!({}),
            private_metadata: json!({}),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_uncommitted_changes_are_discarded() {
        let store = MemoryTeamStore::new();
        let data = new_team("acme");
        let id = data.id;

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_team(data).await.unwrap();
            assert!(tx.find_team(id).await.unwrap().is_some());
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_team(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let store = MemoryTeamStore::new();
        let data = new_team("acme");
        let id = data.id;

        let mut tx = store.begin().await.unwrap();
        tx.insert_team(data).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.clone().begin().await.unwrap();
        assert!(tx.find_team_by_slug("acme").await.unwrap().is_some());
        assert!(tx.find_team(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_slug_unique() {
        let store = MemoryTeamStore::new();
        let mut tx = store.begin().await.unwrap();

        tx.insert_team(new_team("acme")).await.unwrap();
        let err = tx.insert_team(new_team("acme")).await.unwrap_err();
        assert!(matches!(err, AccessError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_membership_unique_and_guarded_delete() {
        let store = MemoryTeamStore::new();
        let mut tx = store.begin().await.unwrap();
        let team = tx.insert_team(new_team("acme")).await.unwrap();
        let owner = team.primary_owner_identity;

        let row = CreateMembership {
            team_id: team.id,
            user_identity: owner,
            role: Role::Owner,
            created_at: Utc::now(),
        };
        tx.insert_membership(row.clone()).await.unwrap();
        assert_eq!(
            tx.insert_membership(row).await.unwrap_err(),
            AccessError::AlreadyMember
        );

        assert!(!tx.delete_membership(team.id, owner).await.unwrap());
        assert!(tx.find_membership(team.id, owner).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_membership_requires_team() {
        let store = MemoryTeamStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = tx
            .insert_membership(CreateMembership {
                team_id: Uuid::new_v4(),
                user_identity: Uuid::new_v4(),
                role: Role::Member,
                created_at: Utc::now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_set_primary_owner_compare_and_set() {
        let store = MemoryTeamStore::new();
        let mut tx = store.begin().await.unwrap();
        let team = tx.insert_team(new_team("acme")).await.unwrap();
        let next = Uuid::new_v4();

        let stale = Uuid::new_v4();
        assert!(
            !tx.set_primary_owner(team.id, stale, next, stale, Utc::now())
                .await
                .unwrap()
        );

        let owner = team.primary_owner_identity;
        assert!(
            tx.set_primary_owner(team.id, owner, next, owner, Utc::now())
                .await
                .unwrap()
        );
        let team = tx.find_team(team.id).await.unwrap().unwrap();
        assert_eq!(team.primary_owner_identity, next);
    }
}
