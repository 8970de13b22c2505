//! End-to-end tests for team workflows against the in-memory store.
//!
//! Run with: `cargo test --test e2e_teams`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use teamward::events::{Listener, TeamEvent};
use teamward::teams::{
    CreateTeamInput, InvitationKind, InvitationLookup, InvitationQuery, Role, RoleInfo, TeamUpdate,
};
use teamward::{AccessError, AccessGateway, Caller, EventBus, MemoryTeamStore, SecretString};
use uuid::Uuid;

fn gateway() -> AccessGateway<MemoryTeamStore> {
    AccessGateway::new(MemoryTeamStore::new())
}

fn user() -> Caller {
    Caller::user(Uuid::new_v4())
}

#[tokio::test]
async fn test_invite_accept_transfer_workflow() {
    let gateway = gateway();
    let alice = user();
    let bob = user();

    let team = gateway
        .create_team(&alice, CreateTeamInput::named("Acme"))
        .await
        .unwrap();
    assert_eq!(team.slug.as_deref(), Some("acme"));
    assert_eq!(team.primary_owner_identity, alice.identity);

    let created = gateway
        .create_invitation(&alice, team.id, Role::Member, InvitationKind::SingleUse)
        .await
        .unwrap();
    assert!(created.token.expose_secret().len() >= 30);

    let lookup = gateway.lookup_invitation(&created.token).await.unwrap();
    assert!(lookup.active);
    assert_eq!(lookup.team_name.as_deref(), Some("Acme"));

    let accepted = gateway
        .accept_invitation(&bob, &created.token)
        .await
        .unwrap();
    assert_eq!(accepted.team_id, team.id);
    assert_eq!(accepted.role, Role::Member);
    assert_eq!(accepted.slug.as_deref(), Some("acme"));

    // single use: consumed by the first acceptance
    assert_eq!(
        gateway.lookup_invitation(&created.token).await.unwrap(),
        InvitationLookup::inactive()
    );
    let err = gateway
        .accept_invitation(&user(), &created.token)
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::NotFound("Invitation not found".to_owned()));

    // hand primary ownership to bob
    let info = gateway
        .update_team_user_role(&alice, team.id, bob.identity, Role::Owner, true)
        .await
        .unwrap();
    assert_eq!(
        info,
        RoleInfo {
            role: Role::Owner,
            is_primary_owner: true
        }
    );

    let team = gateway.get_team(&alice, team.id).await.unwrap();
    assert_eq!(team.primary_owner_identity, bob.identity);

    // alice is still an owner but can no longer remove bob
    let err = gateway
        .remove_team_member(&alice, team.id, bob.identity)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvariantViolation(_)));

    let members = gateway.list_members(&bob, team.id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].user_identity, bob.identity);
    assert!(members[0].is_primary_owner);
    assert_eq!(members[1].role, Role::Owner);

    // bob can remove alice
    gateway
        .remove_team_member(&bob, team.id, alice.identity)
        .await
        .unwrap();
    let err = gateway.get_team(&alice, team.id).await.unwrap_err();
    assert!(matches!(err, AccessError::NotFound(_)));
}

#[tokio::test]
async fn test_time_limited_invitation_is_reusable() {
    let gateway = gateway();
    let alice = user();
    let team = gateway
        .create_team(&alice, CreateTeamInput::named("Acme"))
        .await
        .unwrap();

    let created = gateway
        .create_invitation(&alice, team.id, Role::Member, InvitationKind::TimeLimited)
        .await
        .unwrap();

    let bob = user();
    let carol = user();
    gateway.accept_invitation(&bob, &created.token).await.unwrap();
    gateway
        .accept_invitation(&carol, &created.token)
        .await
        .unwrap();

    assert_eq!(
        gateway.accept_invitation(&bob, &created.token).await,
        Err(AccessError::AlreadyMember)
    );
    assert!(gateway.lookup_invitation(&created.token).await.unwrap().active);
    assert_eq!(gateway.list_members(&alice, team.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_unknown_token_lookup() {
    let gateway = gateway();
    let lookup = gateway
        .lookup_invitation(&SecretString::new("no-such-token-no-such-token-xx"))
        .await
        .unwrap();

    assert!(!lookup.active);
    assert!(lookup.team_name.is_none());
}

#[tokio::test]
async fn test_slug_normalization_conflict() {
    let gateway = gateway();
    let alice = user();

    let team = gateway
        .create_team(&alice, CreateTeamInput::named("My Team!"))
        .await
        .unwrap();
    assert_eq!(team.slug.as_deref(), Some("my-team-"));

    let err = gateway
        .create_team(&user(), CreateTeamInput::named("my team?"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::Conflict(_)));

    let found = gateway.get_team_by_slug(&alice, "My Team!").await.unwrap();
    assert_eq!(found.id, team.id);
}

#[tokio::test]
async fn test_has_role_is_exact() {
    let gateway = gateway();
    let alice = user();
    let bob = user();
    let team = gateway
        .create_team(&alice, CreateTeamInput::named("Acme"))
        .await
        .unwrap();
    gateway
        .update_member_role(&alice, team.id, bob.identity, Role::Member)
        .await
        .unwrap();

    assert!(gateway.has_role(&alice, team.id, Some(Role::Owner)).await.unwrap());
    assert!(!gateway.has_role(&alice, team.id, Some(Role::Member)).await.unwrap());
    assert!(gateway.has_role(&alice, team.id, None).await.unwrap());
    assert!(gateway.has_role(&bob, team.id, Some(Role::Member)).await.unwrap());
    assert!(!gateway.has_role(&bob, team.id, Some(Role::Owner)).await.unwrap());

    let service = Caller::service(Uuid::new_v4());
    assert!(gateway.has_role(&service, team.id, Some(Role::Owner)).await.unwrap());

    let owned = gateway
        .teams_with_role(&alice, Some(Role::Owner))
        .await
        .unwrap();
    assert!(owned.contains(&team.id));
    assert!(
        gateway
            .teams_with_role(&bob, Some(Role::Owner))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_primary_owner_cannot_be_removed_or_demoted() {
    let gateway = gateway();
    let alice = user();
    let bob = user();
    let service = Caller::service(Uuid::new_v4());
    let team = gateway
        .create_team(&alice, CreateTeamInput::named("Acme"))
        .await
        .unwrap();
    gateway
        .update_member_role(&alice, team.id, bob.identity, Role::Owner)
        .await
        .unwrap();

    for caller in [&alice, &bob, &service] {
        let err = gateway
            .remove_team_member(caller, team.id, alice.identity)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::InvariantViolation(_)), "{err:?}");
    }

    let err = gateway
        .update_member_role(&bob, team.id, alice.identity, Role::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvariantViolation(_)));

    let err = gateway
        .update_team_user_role(&bob, team.id, alice.identity, Role::Member, false)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::NotAuthorized(_)));

    let info = gateway.current_role(&alice, team.id).await.unwrap();
    assert_eq!(info.role, Role::Owner);
    assert!(info.is_primary_owner);
}

#[tokio::test]
async fn test_non_primary_cannot_transfer() {
    let gateway = gateway();
    let alice = user();
    let bob = user();
    let team = gateway
        .create_team(&alice, CreateTeamInput::named("Acme"))
        .await
        .unwrap();
    gateway
        .update_member_role(&alice, team.id, bob.identity, Role::Owner)
        .await
        .unwrap();

    let err = gateway
        .update_team_user_role(&bob, team.id, bob.identity, Role::Owner, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::NotAuthorized(_)));

    let team = gateway.get_team(&bob, team.id).await.unwrap();
    assert_eq!(team.primary_owner_identity, alice.identity);
}

#[tokio::test]
async fn test_update_team_fields() {
    let gateway = gateway();
    let alice = user();
    let bob = user();
    let team = gateway
        .create_team(&alice, CreateTeamInput::named("Acme"))
        .await
        .unwrap();
    gateway
        .update_member_role(&alice, team.id, bob.identity, Role::Member)
        .await
        .unwrap();

    let updated = gateway
        .update_team(
            &alice,
            team.id,
            TeamUpdate {
                name: Some("Acme Corp".to_owned()),
                public_metadata: Some(json!({"plan": "pro"})),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name.as_deref(), Some("Acme Corp"));
    assert_eq!(updated.public_metadata["plan"], "pro");
    assert_eq!(updated.updated_by, alice.identity);

    // members cannot update
    let err = gateway
        .update_team(&bob, team.id, TeamUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::NotAuthorized(_)));

    // protected fields
    let err = gateway
        .update_team(
            &alice,
            team.id,
            TeamUpdate {
                primary_owner_identity: Some(bob.identity),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::ProtectedField("primary_owner_identity"));

    // private metadata is service-only
    let err = gateway
        .update_team(
            &alice,
            team.id,
            TeamUpdate {
                private_metadata: Some(json!({"stripe": "cus_123"})),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::NotAuthorized(_)));

    let service = Caller::service(Uuid::new_v4());
    let updated = gateway
        .update_team(
            &service,
            team.id,
            TeamUpdate {
                private_metadata: Some(json!({"stripe": "cus_123"})),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.private_metadata["stripe"], "cus_123");
    assert_eq!(updated.public_metadata["plan"], "pro");
}

#[tokio::test]
async fn test_visibility() {
    let gateway = gateway();
    let alice = user();
    let stranger = user();
    let team = gateway
        .create_team(&alice, CreateTeamInput::named("Acme"))
        .await
        .unwrap();

    let err = gateway.get_team(&stranger, team.id).await.unwrap_err();
    assert!(matches!(err, AccessError::NotFound(_)));
    let err = gateway.list_members(&stranger, team.id).await.unwrap_err();
    assert!(matches!(err, AccessError::NotFound(_)));
    assert!(gateway.list_teams(&stranger).await.unwrap().is_empty());

    let teams = gateway.list_teams(&alice).await.unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].role, Role::Owner);
    assert!(teams[0].is_primary_owner);
}

#[tokio::test]
async fn test_invitation_management_requires_owner() {
    let gateway = gateway();
    let alice = user();
    let bob = user();
    let team = gateway
        .create_team(&alice, CreateTeamInput::named("Acme"))
        .await
        .unwrap();
    gateway
        .update_member_role(&alice, team.id, bob.identity, Role::Member)
        .await
        .unwrap();

    let err = gateway
        .create_invitation(&bob, team.id, Role::Member, InvitationKind::SingleUse)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::NotAuthorized(_)));

    let created = gateway
        .create_invitation(&alice, team.id, Role::Member, InvitationKind::SingleUse)
        .await
        .unwrap();

    let err = gateway
        .list_invitations(&bob, team.id, InvitationQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::NotAuthorized(_)));

    let err = gateway
        .delete_invitation(&bob, created.invitation.invitation_id)
        .await
        .unwrap_err();
    // same answer as for an id that never existed
    assert_eq!(err, AccessError::NotFound("Invitation not found".to_owned()));
    assert_eq!(
        gateway
            .delete_invitation(&bob, Uuid::new_v4())
            .await
            .unwrap_err(),
        err
    );

    let page = gateway
        .list_invitations(
            &alice,
            team.id,
            InvitationQuery {
                limit: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].invitation_id, created.invitation.invitation_id);
}

#[tokio::test]
async fn test_concurrent_single_use_accept() {
    let gateway = gateway();
    let alice = user();
    let team = gateway
        .create_team(&alice, CreateTeamInput::named("Acme"))
        .await
        .unwrap();
    let created = gateway
        .create_invitation(&alice, team.id, Role::Member, InvitationKind::SingleUse)
        .await
        .unwrap();

    let bob = user();
    let carol = user();
    let (first, second) = tokio::join!(
        gateway.accept_invitation(&bob, &created.token),
        gateway.accept_invitation(&carol, &created.token),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(
        failure,
        AccessError::NotFound(_) | AccessError::AlreadyMember
    ));
    assert_eq!(gateway.list_members(&alice, team.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_transfers() {
    let gateway = gateway();
    let alice = user();
    let bob = user();
    let carol = user();
    let team = gateway
        .create_team(&alice, CreateTeamInput::named("Acme"))
        .await
        .unwrap();
    for member in [&bob, &carol] {
        gateway
            .update_member_role(&alice, team.id, member.identity, Role::Owner)
            .await
            .unwrap();
    }

    let (to_bob, to_carol) = tokio::join!(
        gateway.update_team_user_role(&alice, team.id, bob.identity, Role::Owner, true),
        gateway.update_team_user_role(&alice, team.id, carol.identity, Role::Owner, true),
    );

    assert!(to_bob.is_ok() != to_carol.is_ok());
    let loser = if to_bob.is_ok() { to_carol } else { to_bob };
    assert!(matches!(loser, Err(AccessError::NotAuthorized(_))));

    let team = gateway.get_team(&alice, team.id).await.unwrap();
    assert!(
        team.primary_owner_identity == bob.identity
            || team.primary_owner_identity == carol.identity
    );
}

struct Recorder(Arc<Mutex<Vec<TeamEvent>>>);

#[async_trait]
impl Listener for Recorder {
    async fn handle(&self, event: &TeamEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

#[tokio::test]
async fn test_events_follow_commits() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let gateway = gateway().with_events(EventBus::new().listen(Recorder(Arc::clone(&events))));
    let alice = user();
    let bob = user();
    let team = gateway
        .create_team(&alice, CreateTeamInput::named("Evented"))
        .await
        .unwrap();
    gateway
        .update_member_role(&alice, team.id, bob.identity, Role::Owner)
        .await
        .unwrap();
    gateway
        .update_team_user_role(&alice, team.id, bob.identity, Role::Owner, true)
        .await
        .unwrap();
    gateway
        .remove_team_member(&alice, team.id, bob.identity)
        .await
        .unwrap_err();

    let names: Vec<&'static str> = events
        .lock()
        .unwrap()
        .iter()
        .map(TeamEvent::name)
        .collect();
    assert_eq!(
        names,
        [
            "team.created",
            "team.member.role_changed",
            "team.member.role_changed",
            "team.owner.transferred",
        ]
    );
}
