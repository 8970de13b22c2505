//! Invitation lifecycle: issue, look up, accept, list and revoke tokens.
//!
//! An invitation is active while it is younger than the configured lifetime.
//! Expired invitations are never swept; every read filters them out.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::authorizer::Authorizer;
use super::store::{CreateInvitation, CreateMembership, InvitationPage, TeamTransaction};
use super::types::{
    AcceptedInvitation, CreatedInvitation, InvitationKind, InvitationLookup, InvitationQuery,
    InvitationSummary, TeamInvitation,
};
use super::{Role, directory};
use crate::config::AccessConfig;
use crate::crypto::{generate_token, hash_token};
use crate::{AccessError, Caller, SecretString};

/// Issues an invitation to join a team with `role`.
///
/// Requires exact `owner` membership (or a service caller). The plain token
/// is only present in the returned value.
///
/// # Returns
///
/// - `Ok(created)` - invitation stored, token for delivery
/// - `Err(AccessError::NotAuthorized)` - caller is not an owner
/// - `Err(AccessError::NotFound)` - team does not exist
pub async fn create(
    tx: &mut dyn TeamTransaction,
    config: &AccessConfig,
    caller: &Caller,
    team_id: Uuid,
    role: Role,
    kind: InvitationKind,
    now: DateTime<Utc>,
) -> Result<CreatedInvitation, AccessError> {
    Authorizer::require(tx, caller, team_id, Role::Owner).await?;
    let team = directory::load(tx, team_id).await?;

    let token = generate_token(config.invitations.effective_token_length());

    let invitation = tx
        .insert_invitation(CreateInvitation {
            id: Uuid::new_v4(),
            team_id,
            role,
            token_hash: hash_token(&token),
            invited_by_identity: caller.identity,
            team_name_snapshot: team.name,
            kind,
            created_at: now,
        })
        .await?;

    Ok(CreatedInvitation {
        invitation: InvitationSummary::from(&invitation),
        token: SecretString::new(token),
    })
}

/// Reports whether a token is active, without any authorization.
///
/// Unknown and expired tokens both read as inactive with no team name.
pub async fn lookup(
    tx: &mut dyn TeamTransaction,
    config: &AccessConfig,
    token: &SecretString,
    now: DateTime<Utc>,
) -> Result<InvitationLookup, AccessError> {
    match find_active(tx, config, token, now).await? {
        Some(invitation) => Ok(InvitationLookup {
            active: true,
            team_name: invitation.team_name_snapshot,
        }),
        None => Ok(InvitationLookup::inactive()),
    }
}

/// Accepts an invitation for the caller.
///
/// The membership insert and, for single-use invitations, the invitation
/// delete happen in the same transaction.
///
/// # Returns
///
/// - `Ok(accepted)` - caller is now a member
/// - `Err(AccessError::NotFound)` - token unknown, consumed or expired
/// - `Err(AccessError::AlreadyMember)` - caller already belongs to the team
pub async fn accept(
    tx: &mut dyn TeamTransaction,
    config: &AccessConfig,
    caller: &Caller,
    token: &SecretString,
    now: DateTime<Utc>,
) -> Result<(AcceptedInvitation, TeamInvitation), AccessError> {
    let invitation = find_active(tx, config, token, now)
        .await?
        .ok_or_else(invitation_not_found)?;

    if tx
        .find_membership(invitation.team_id, caller.identity)
        .await?
        .is_some()
    {
        return Err(AccessError::AlreadyMember);
    }

    tx.insert_membership(CreateMembership {
        team_id: invitation.team_id,
        user_identity: caller.identity,
        role: invitation.role,
        created_at: now,
    })
    .await?;

    if invitation.kind == InvitationKind::SingleUse && !tx.delete_invitation(invitation.id).await? {
        // consumed by someone else since we read it
        return Err(invitation_not_found());
    }

    let team = directory::load(tx, invitation.team_id).await?;

    Ok((
        AcceptedInvitation {
            team_id: team.id,
            role: invitation.role,
            slug: team.slug,
        },
        invitation,
    ))
}

/// Lists a team's active invitations, newest first.
///
/// Requires exact `owner` membership (or a service caller).
pub async fn list(
    tx: &mut dyn TeamTransaction,
    config: &AccessConfig,
    caller: &Caller,
    team_id: Uuid,
    query: InvitationQuery,
    now: DateTime<Utc>,
) -> Result<Vec<InvitationSummary>, AccessError> {
    Authorizer::require(tx, caller, team_id, Role::Owner).await?;

    let cutoff = TeamInvitation::active_since(now, config.invitations.lifetime);
    let created_after = query.created_after.map_or(cutoff, |after| after.max(cutoff));

    let invitations = tx
        .list_invitations(InvitationPage {
            team_id,
            created_after,
            created_before: query.created_before,
            limit: config.page_size(query.limit),
            offset: query.offset,
        })
        .await?;

    Ok(invitations.iter().map(InvitationSummary::from).collect())
}

/// Revokes an invitation. Requires exact `owner` membership on its team.
///
/// A caller without that role gets the same `NotFound` as for an unknown id.
pub async fn delete(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    invitation_id: Uuid,
) -> Result<TeamInvitation, AccessError> {
    let invitation = tx
        .find_invitation(invitation_id)
        .await?
        .ok_or_else(invitation_not_found)?;

    if !Authorizer::check(tx, caller, invitation.team_id, Some(Role::Owner)).await? {
        log::debug!(
            target: "teamward",
            "msg=\"invitation revoke denied\", invitation_id={invitation_id}, identity={}",
            caller.identity
        );
        return Err(invitation_not_found());
    }

    if !tx.delete_invitation(invitation_id).await? {
        return Err(invitation_not_found());
    }

    Ok(invitation)
}

async fn find_active(
    tx: &mut dyn TeamTransaction,
    config: &AccessConfig,
    token: &SecretString,
    now: DateTime<Utc>,
) -> Result<Option<TeamInvitation>, AccessError> {
    let invitation = tx.find_invitation_by_token_hash(&token.digest()).await?;
    Ok(invitation.filter(|i| i.is_active(now, config.invitations.lifetime)))
}

fn invitation_not_found() -> AccessError {
    AccessError::not_found("Invitation not found")
}
