//! Membership store: the authoritative user/team/role relation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::authorizer::Authorizer;
use super::directory;
use super::store::{CreateMembership, TeamTransaction};
use super::types::{RoleInfo, Team, TeamMember, TeamMembership};
use super::Role;
use crate::{AccessError, Caller};

/// Whether the caller holds `role` (exactly) on the team, or any role when
/// `role` is `None`. Always true for a service caller.
pub async fn has_role(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    team_id: Uuid,
    role: Option<Role>,
) -> Result<bool, AccessError> {
    Authorizer::check(tx, caller, team_id, role).await
}

/// Teams where the caller's role equals `role`, or all of the caller's teams
/// when `role` is `None`.
pub async fn teams_with_role(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    role: Option<Role>,
) -> Result<BTreeSet<Uuid>, AccessError> {
    let memberships = tx.memberships_for_user(caller.identity).await?;

    Ok(memberships
        .into_iter()
        .filter(|m| role.is_none_or(|r| m.role == r))
        .map(|m| m.team_id)
        .collect())
}

/// Idempotently gives `identity` the owner role on a team.
pub async fn upsert_owner(
    tx: &mut dyn TeamTransaction,
    team_id: Uuid,
    identity: Uuid,
    now: DateTime<Utc>,
) -> Result<TeamMembership, AccessError> {
    tx.upsert_membership(CreateMembership {
        team_id,
        user_identity: identity,
        role: Role::Owner,
        created_at: now,
    })
    .await
}

/// Sets a member's role. Requires an exact `owner` caller.
///
/// # Returns
///
/// - `Err(AccessError::NotAuthorized)` - caller is not an owner of the team
/// - `Err(AccessError::NotFound)` - team does not exist
/// - `Err(AccessError::InvariantViolation)` - would demote the primary owner
pub async fn update_role(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    team_id: Uuid,
    identity: Uuid,
    role: Role,
    now: DateTime<Utc>,
) -> Result<TeamMembership, AccessError> {
    Authorizer::require(tx, caller, team_id, Role::Owner).await?;
    let team = directory::load(tx, team_id).await?;
    set_role(tx, &team, identity, role, now).await
}

/// Writes a role without authorization, refusing to demote the primary owner.
pub(crate) async fn set_role(
    tx: &mut dyn TeamTransaction,
    team: &Team,
    identity: Uuid,
    role: Role,
    now: DateTime<Utc>,
) -> Result<TeamMembership, AccessError> {
    if identity == team.primary_owner_identity && role != Role::Owner {
        return Err(AccessError::InvariantViolation(
            "the primary owner must keep the owner role".to_owned(),
        ));
    }

    tx.upsert_membership(CreateMembership {
        team_id: team.id,
        user_identity: identity,
        role,
        created_at: now,
    })
    .await
}

/// Removes a member from a team. The primary owner can never be removed.
///
/// # Returns
///
/// - `Err(AccessError::NotAuthorized)` - caller is not an owner of the team
/// - `Err(AccessError::InvariantViolation)` - `identity` is the primary owner
/// - `Err(AccessError::NotFound)` - team or membership does not exist
pub async fn remove(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    team_id: Uuid,
    identity: Uuid,
) -> Result<(), AccessError> {
    Authorizer::require(tx, caller, team_id, Role::Owner).await?;
    let team = directory::load(tx, team_id).await?;

    if identity == team.primary_owner_identity {
        return Err(primary_owner_removal());
    }

    if tx.delete_membership(team_id, identity).await? {
        return Ok(());
    }

    // nothing deleted: either there was no row or the guarded delete saw a
    // different primary owner than the read above
    match tx.find_membership(team_id, identity).await? {
        Some(_) => Err(primary_owner_removal()),
        None => Err(AccessError::not_found("Membership not found")),
    }
}

/// Lists a team's members. Visible to members and service callers only.
pub async fn list_members(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    team_id: Uuid,
) -> Result<Vec<TeamMember>, AccessError> {
    if !Authorizer::check(tx, caller, team_id, None).await? {
        return Err(directory::team_not_found());
    }
    let team = directory::load(tx, team_id).await?;

    let mut members: Vec<TeamMember> = tx
        .memberships_for_team(team_id)
        .await?
        .into_iter()
        .map(|m| TeamMember {
            user_identity: m.user_identity,
            role: m.role,
            is_primary_owner: m.user_identity == team.primary_owner_identity,
        })
        .collect();

    // primary owner first, then by role, then stable by identity
    members.sort_by(|a, b| {
        b.is_primary_owner
            .cmp(&a.is_primary_owner)
            .then(b.role.cmp(&a.role))
            .then(a.user_identity.cmp(&b.user_identity))
    });

    Ok(members)
}

/// The caller's own role on a team.
pub async fn current_role(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    team_id: Uuid,
) -> Result<RoleInfo, AccessError> {
    let membership = tx
        .find_membership(team_id, caller.identity)
        .await?
        .ok_or_else(directory::team_not_found)?;
    let team = directory::load(tx, team_id).await?;

    Ok(RoleInfo {
        role: membership.role,
        is_primary_owner: team.primary_owner_identity == caller.identity,
    })
}

fn primary_owner_removal() -> AccessError {
    AccessError::InvariantViolation("the primary owner cannot be removed from a team".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTeamStore;
    use crate::teams::store::TeamStore;
    use crate::teams::types::CreateTeamInput;

    async fn seeded() -> (MemoryTeamStore, Caller, Uuid) {
        let store = MemoryTeamStore::new();
        let owner = Caller::user(Uuid::new_v4());

        let mut tx = store.begin().await.unwrap();
        let team = directory::create(tx.as_mut(), &owner, CreateTeamInput::named("Acme"), Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        (store, owner, team.id)
    }

    #[tokio::test]
    async fn test_has_role_exact_match() {
        let (store, owner, team_id) = seeded().await;
        let mut tx = store.begin().await.unwrap();

        assert!(has_role(tx.as_mut(), &owner, team_id, None).await.unwrap());
        assert!(has_role(tx.as_mut(), &owner, team_id, Some(Role::Owner)).await.unwrap());
        assert!(!has_role(tx.as_mut(), &owner, team_id, Some(Role::Member)).await.unwrap());

        let stranger = Caller::user(Uuid::new_v4());
        assert!(!has_role(tx.as_mut(), &stranger, team_id, None).await.unwrap());

        let service = Caller::service(Uuid::new_v4());
        assert!(has_role(tx.as_mut(), &service, team_id, Some(Role::Member)).await.unwrap());
    }

    #[tokio::test]
    async fn test_teams_with_role() {
        let (store, owner, team_id) = seeded().await;
        let mut tx = store.begin().await.unwrap();

        let all = teams_with_role(tx.as_mut(), &owner, None).await.unwrap();
        assert_eq!(all.into_iter().collect::<Vec<_>>(), vec![team_id]);

        let owned = teams_with_role(tx.as_mut(), &owner, Some(Role::Owner)).await.unwrap();
        assert!(owned.contains(&team_id));

        let member_of = teams_with_role(tx.as_mut(), &owner, Some(Role::Member)).await.unwrap();
        assert!(member_of.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_owner_is_idempotent() {
        let (store, owner, team_id) = seeded().await;
        let mut tx = store.begin().await.unwrap();

        upsert_owner(tx.as_mut(), team_id, owner.identity, Utc::now()).await.unwrap();
        upsert_owner(tx.as_mut(), team_id, owner.identity, Utc::now()).await.unwrap();

        let rows = tx.memberships_for_team(team_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role, Role::Owner);
    }

    #[tokio::test]
    async fn test_update_role_requires_owner() {
        let (store, owner, team_id) = seeded().await;
        let member = Uuid::new_v4();
        let mut tx = store.begin().await.unwrap();

        update_role(tx.as_mut(), &owner, team_id, member, Role::Member, Utc::now())
            .await
            .unwrap();

        let err = update_role(
            tx.as_mut(),
            &Caller::user(member),
            team_id,
            owner.identity,
            Role::Member,
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AccessError::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn test_update_role_cannot_demote_primary_owner() {
        let (store, owner, team_id) = seeded().await;
        let mut tx = store.begin().await.unwrap();

        let err = update_role(tx.as_mut(), &owner, team_id, owner.identity, Role::Member, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn test_remove_member() {
        let (store, owner, team_id) = seeded().await;
        let member = Uuid::new_v4();
        let mut tx = store.begin().await.unwrap();

        update_role(tx.as_mut(), &owner, team_id, member, Role::Member, Utc::now())
            .await
            .unwrap();
        remove(tx.as_mut(), &owner, team_id, member).await.unwrap();

        let err = remove(tx.as_mut(), &owner, team_id, member).await.unwrap_err();
        assert!(matches!(err, AccessError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_primary_owner_always_fails() {
        let (store, owner, team_id) = seeded().await;
        let mut tx = store.begin().await.unwrap();

        let err = remove(tx.as_mut(), &owner, team_id, owner.identity).await.unwrap_err();
        assert!(matches!(err, AccessError::InvariantViolation(_)));

        let service = Caller::service(Uuid::new_v4());
        let err = remove(tx.as_mut(), &service, team_id, owner.identity).await.unwrap_err();
        assert!(matches!(err, AccessError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn test_list_members_and_current_role() {
        let (store, owner, team_id) = seeded().await;
        let member = Uuid::new_v4();
        let mut tx = store.begin().await.unwrap();

        update_role(tx.as_mut(), &owner, team_id, member, Role::Member, Utc::now())
            .await
            .unwrap();

        let members = list_members(tx.as_mut(), &Caller::user(member), team_id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert!(members[0].is_primary_owner);
        assert_eq!(members[0].user_identity, owner.identity);
        assert_eq!(members[1].role, Role::Member);

        let info = current_role(tx.as_mut(), &Caller::user(member), team_id).await.unwrap();
        assert_eq!(info.role, Role::Member);
        assert!(!info.is_primary_owner);

        let stranger = Caller::user(Uuid::new_v4());
        assert!(matches!(
            list_members(tx.as_mut(), &stranger, team_id).await.unwrap_err(),
            AccessError::NotFound(_)
        ));
        assert!(matches!(
            current_role(tx.as_mut(), &stranger, team_id).await.unwrap_err(),
            AccessError::NotFound(_)
        ));
    }
}
