//! The public entry point: one method per access-control operation.
//!
//! Every method opens exactly one store transaction, runs the component
//! functions from [`crate::teams`] inside it and commits. Any error drops the
//! transaction, which rolls it back. Events are published on the gateway's
//! [`EventBus`] only after a successful commit.

use std::collections::BTreeSet;

use chrono::Utc;
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::events::{EventBus, TeamEvent};
use crate::teams::{
    AcceptedInvitation, CreateTeamInput, CreatedInvitation, InvitationKind, InvitationLookup,
    InvitationQuery, InvitationSummary, Role, RoleInfo, Team, TeamMember, TeamMembership,
    TeamStore, TeamSummary, TeamUpdate, directory, invitations, membership, ownership,
};
use crate::{AccessError, Caller, SecretString};

/// Runs team operations against a [`TeamStore`].
///
/// Cheap to share behind an `Arc`; the store does its own synchronization.
pub struct AccessGateway<S: TeamStore> {
    store: S,
    config: AccessConfig,
    events: EventBus,
}

impl<S: TeamStore> AccessGateway<S> {
    /// Creates a gateway with [`AccessConfig::default`].
    pub fn new(store: S) -> Self {
        Self::with_config(store, AccessConfig::default())
    }

    pub fn with_config(store: S, config: AccessConfig) -> Self {
        Self {
            store,
            config,
            events: EventBus::new(),
        }
    }

    /// Replaces the gateway's event bus. Without one, committed changes
    /// publish to no listeners.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ------------------------------------------------------------------
    // teams
    // ------------------------------------------------------------------

    /// Creates a team owned by `caller`, who becomes its primary owner.
    ///
    /// # Returns
    ///
    /// - `Ok(team)` - team and owner membership stored
    /// - `Err(AccessError::Conflict)` - the normalized slug is taken
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "create_team", skip_all, fields(identity = %caller.identity), err)
    )]
    pub async fn create_team(
        &self,
        caller: &Caller,
        input: CreateTeamInput,
    ) -> Result<Team, AccessError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let team = directory::create(tx.as_mut(), caller, input, now).await?;
        tx.commit().await?;

        log::info!(
            target: "teamward",
            "msg=\"team created\", team_id={}, slug={:?}, identity={}",
            team.id,
            team.slug,
            caller.identity
        );

        self.events
            .publish(TeamEvent::TeamCreated {
                team_id: team.id,
                slug: team.slug.clone(),
                created_by: caller.identity,
                at: now,
            })
            .await;

        Ok(team)
    }

    /// Applies a partial update. Requires `owner`.
    ///
    /// Changing `id` or `primary_owner_identity` through here fails with
    /// [`AccessError::ProtectedField`]; only a service caller may write
    /// `private_metadata`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "update_team", skip_all, fields(%team_id), err)
    )]
    pub async fn update_team(
        &self,
        caller: &Caller,
        team_id: Uuid,
        changes: TeamUpdate,
    ) -> Result<Team, AccessError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let team = directory::update(tx.as_mut(), caller, team_id, changes, now).await?;
        tx.commit().await?;

        log::info!(
            target: "teamward",
            "msg=\"team updated\", team_id={team_id}, identity={}",
            caller.identity
        );

        self.events
            .publish(TeamEvent::TeamUpdated {
                team_id,
                updated_by: caller.identity,
                at: now,
            })
            .await;

        Ok(team)
    }

    /// Fetches a team visible to `caller`. Invisible teams are `NotFound`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "get_team", skip_all, fields(%team_id), err)
    )]
    pub async fn get_team(&self, caller: &Caller, team_id: Uuid) -> Result<Team, AccessError> {
        let mut tx = self.store.begin().await?;
        let team = directory::get(tx.as_mut(), caller, team_id).await?;
        tx.commit().await?;
        Ok(team)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "get_team_by_slug", skip_all, fields(slug = %slug), err)
    )]
    pub async fn get_team_by_slug(&self, caller: &Caller, slug: &str) -> Result<Team, AccessError> {
        let mut tx = self.store.begin().await?;
        let team = directory::get_by_slug(tx.as_mut(), caller, slug).await?;
        tx.commit().await?;
        Ok(team)
    }

    /// Teams the caller belongs to, with the caller's role on each.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "list_teams", skip_all, err)
    )]
    pub async fn list_teams(&self, caller: &Caller) -> Result<Vec<TeamSummary>, AccessError> {
        let mut tx = self.store.begin().await?;
        let teams = directory::list_for_caller(tx.as_mut(), caller).await?;
        tx.commit().await?;
        Ok(teams)
    }

    // ------------------------------------------------------------------
    // membership
    // ------------------------------------------------------------------

    /// Exact role check. `None` asks for any membership.
    ///
    /// An `owner` row does not satisfy a `member` check.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "has_role", skip_all, fields(%team_id, ?role), err)
    )]
    pub async fn has_role(
        &self,
        caller: &Caller,
        team_id: Uuid,
        role: Option<Role>,
    ) -> Result<bool, AccessError> {
        let mut tx = self.store.begin().await?;
        let allowed = membership::has_role(tx.as_mut(), caller, team_id, role).await?;
        tx.commit().await?;
        Ok(allowed)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "teams_with_role", skip_all, fields(?role), err)
    )]
    pub async fn teams_with_role(
        &self,
        caller: &Caller,
        role: Option<Role>,
    ) -> Result<BTreeSet<Uuid>, AccessError> {
        let mut tx = self.store.begin().await?;
        let teams = membership::teams_with_role(tx.as_mut(), caller, role).await?;
        tx.commit().await?;
        Ok(teams)
    }

    /// The caller's own role on a team. Non-members get `NotFound`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "current_role", skip_all, fields(%team_id), err)
    )]
    pub async fn current_role(
        &self,
        caller: &Caller,
        team_id: Uuid,
    ) -> Result<RoleInfo, AccessError> {
        let mut tx = self.store.begin().await?;
        let info = membership::current_role(tx.as_mut(), caller, team_id).await?;
        tx.commit().await?;
        Ok(info)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "list_members", skip_all, fields(%team_id), err)
    )]
    pub async fn list_members(
        &self,
        caller: &Caller,
        team_id: Uuid,
    ) -> Result<Vec<TeamMember>, AccessError> {
        let mut tx = self.store.begin().await?;
        let members = membership::list_members(tx.as_mut(), caller, team_id).await?;
        tx.commit().await?;
        Ok(members)
    }

    /// Sets `identity`'s role on a team, adding the membership if missing.
    ///
    /// Requires `owner`. Demoting the primary owner fails with
    /// [`AccessError::InvariantViolation`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "update_member_role", skip_all, fields(%team_id, %identity, %role), err)
    )]
    pub async fn update_member_role(
        &self,
        caller: &Caller,
        team_id: Uuid,
        identity: Uuid,
        role: Role,
    ) -> Result<TeamMembership, AccessError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let row = membership::update_role(tx.as_mut(), caller, team_id, identity, role, now).await?;
        tx.commit().await?;

        log::info!(
            target: "teamward",
            "msg=\"member role updated\", team_id={team_id}, user={identity}, role={role}"
        );

        self.events
            .publish(TeamEvent::MemberRoleChanged {
                team_id,
                user_identity: identity,
                role,
                changed_by: caller.identity,
                at: now,
            })
            .await;

        Ok(row)
    }

    /// Changes `target`'s role and, with `make_primary`, hands primary
    /// ownership to them.
    ///
    /// # Returns
    ///
    /// - `Ok(info)` - the target's resulting role
    /// - `Err(AccessError::NotAuthorized)` - caller is not an owner, or
    ///   attempted a transfer without being the primary owner
    /// - `Err(AccessError::InvariantViolation)` - the change would leave the
    ///   team without an owner-role primary owner
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "update_team_user_role",
            skip_all,
            fields(%team_id, %target, %new_role, make_primary = make_primary),
            err
        )
    )]
    pub async fn update_team_user_role(
        &self,
        caller: &Caller,
        team_id: Uuid,
        target: Uuid,
        new_role: Role,
        make_primary: bool,
    ) -> Result<RoleInfo, AccessError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let change = ownership::update_team_user_role(
            tx.as_mut(),
            caller,
            team_id,
            target,
            new_role,
            make_primary,
            now,
        )
        .await?;
        tx.commit().await?;

        log::info!(
            target: "teamward",
            "msg=\"team user role updated\", team_id={team_id}, user={target}, role={new_role}, primary={}",
            change.info.is_primary_owner
        );

        self.events
            .publish(TeamEvent::MemberRoleChanged {
                team_id,
                user_identity: target,
                role: new_role,
                changed_by: caller.identity,
                at: now,
            })
            .await;

        if let Some(from) = change.transferred_from {
            log::info!(
                target: "teamward",
                "msg=\"primary owner transferred\", team_id={team_id}, from={from}, to={target}"
            );

            self.events
                .publish(TeamEvent::PrimaryOwnerTransferred {
                    team_id,
                    from,
                    to: target,
                    at: now,
                })
                .await;
        }

        Ok(change.info)
    }

    /// Removes `identity` from a team. Requires `owner`. The primary owner
    /// can never be removed.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "remove_team_member", skip_all, fields(%team_id, %identity), err)
    )]
    pub async fn remove_team_member(
        &self,
        caller: &Caller,
        team_id: Uuid,
        identity: Uuid,
    ) -> Result<(), AccessError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        membership::remove(tx.as_mut(), caller, team_id, identity).await?;
        tx.commit().await?;

        log::info!(
            target: "teamward",
            "msg=\"member removed\", team_id={team_id}, user={identity}, identity={}",
            caller.identity
        );

        self.events
            .publish(TeamEvent::MemberRemoved {
                team_id,
                user_identity: identity,
                removed_by: caller.identity,
                at: now,
            })
            .await;

        Ok(())
    }

    // ------------------------------------------------------------------
    // invitations
    // ------------------------------------------------------------------

    /// Issues an invitation. The plain token is only available on the
    /// returned value; the store keeps its digest.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "create_invitation", skip_all, fields(%team_id, %role, %kind), err)
    )]
    pub async fn create_invitation(
        &self,
        caller: &Caller,
        team_id: Uuid,
        role: Role,
        kind: InvitationKind,
    ) -> Result<CreatedInvitation, AccessError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let created =
            invitations::create(tx.as_mut(), &self.config, caller, team_id, role, kind, now).await?;
        tx.commit().await?;

        log::info!(
            target: "teamward",
            "msg=\"invitation created\", team_id={team_id}, invitation_id={}, kind={kind}",
            created.invitation.invitation_id
        );

        self.events
            .publish(TeamEvent::InvitationCreated {
                invitation_id: created.invitation.invitation_id,
                team_id,
                role,
                kind,
                invited_by: caller.identity,
                at: now,
            })
            .await;

        Ok(created)
    }

    /// Unauthenticated token check. Unknown and expired tokens look the same.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "lookup_invitation", skip_all, err)
    )]
    pub async fn lookup_invitation(
        &self,
        token: &SecretString,
    ) -> Result<InvitationLookup, AccessError> {
        let mut tx = self.store.begin().await?;
        let lookup = invitations::lookup(tx.as_mut(), &self.config, token, Utc::now()).await?;
        tx.commit().await?;
        Ok(lookup)
    }

    /// Joins the invitation's team with the invited role.
    ///
    /// # Returns
    ///
    /// - `Ok(accepted)` - membership created
    /// - `Err(AccessError::NotFound)` - token unknown, expired or already used
    /// - `Err(AccessError::AlreadyMember)` - caller already belongs to the team
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "accept_invitation", skip_all, fields(identity = %caller.identity), err)
    )]
    pub async fn accept_invitation(
        &self,
        caller: &Caller,
        token: &SecretString,
    ) -> Result<AcceptedInvitation, AccessError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let (accepted, invitation) =
            invitations::accept(tx.as_mut(), &self.config, caller, token, now).await?;
        tx.commit().await?;

        log::info!(
            target: "teamward",
            "msg=\"invitation accepted\", team_id={}, invitation_id={}, user={}",
            accepted.team_id,
            invitation.id,
            caller.identity
        );

        self.events
            .publish(TeamEvent::InvitationAccepted {
                invitation_id: invitation.id,
                team_id: accepted.team_id,
                user_identity: caller.identity,
                role: accepted.role,
                at: now,
            })
            .await;

        Ok(accepted)
    }

    /// Active invitations for a team, newest first. Requires `owner`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "list_invitations", skip_all, fields(%team_id), err)
    )]
    pub async fn list_invitations(
        &self,
        caller: &Caller,
        team_id: Uuid,
        query: InvitationQuery,
    ) -> Result<Vec<InvitationSummary>, AccessError> {
        let mut tx = self.store.begin().await?;
        let page =
            invitations::list(tx.as_mut(), &self.config, caller, team_id, query, Utc::now()).await?;
        tx.commit().await?;
        Ok(page)
    }

    /// Revokes an invitation. Requires `owner` on the invitation's team.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "delete_invitation", skip_all, fields(%invitation_id), err)
    )]
    pub async fn delete_invitation(
        &self,
        caller: &Caller,
        invitation_id: Uuid,
    ) -> Result<(), AccessError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let invitation = invitations::delete(tx.as_mut(), caller, invitation_id).await?;
        tx.commit().await?;

        log::info!(
            target: "teamward",
            "msg=\"invitation revoked\", team_id={}, invitation_id={invitation_id}",
            invitation.team_id
        );

        self.events
            .publish(TeamEvent::InvitationRevoked {
                invitation_id,
                team_id: invitation.team_id,
                revoked_by: caller.identity,
                at: now,
            })
            .await;

        Ok(())
    }
}
