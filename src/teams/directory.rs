//! Team directory: team records, slug handling and the protected-field guard.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::authorizer::Authorizer;
use super::membership;
use super::slug::normalize_slug;
use super::store::{CreateTeam, TeamTransaction};
use super::types::{CreateTeamInput, Team, TeamSummary, TeamUpdate};
use super::Role;
use crate::{AccessError, Caller};

/// Creates a team owned by the caller.
///
/// The caller becomes primary owner and gets an `owner` membership in the
/// same transaction. The slug is normalized, and derived from the name when
/// not given.
///
/// # Returns
///
/// - `Ok(team)` - team created
/// - `Err(AccessError::Conflict)` - a team already uses the normalized slug
pub async fn create(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    input: CreateTeamInput,
    now: DateTime<Utc>,
) -> Result<Team, AccessError> {
    let slug = input
        .slug
        .as_deref()
        .or(input.name.as_deref())
        .map(normalize_slug)
        .filter(|s| !s.is_empty());

    if let Some(slug) = &slug {
        ensure_slug_free(tx, slug, None).await?;
    }

    let team = tx
        .insert_team(CreateTeam {
            id: Uuid::new_v4(),
            name: input.name,
            slug,
            primary_owner_identity: caller.identity,
            public_metadata: Value::Object(Map::new()),
            private_metadata: Value::Object(Map::new()),
            created_at: now,
        })
        .await?;

    membership::upsert_owner(tx, team.id, caller.identity, now).await?;

    Ok(team)
}

/// Applies an update to a team.
///
/// Requires an exact `owner` membership or a service caller. Only a service
/// caller may write `private_metadata`.
///
/// # Returns
///
/// - `Ok(team)` - the updated team
/// - `Err(AccessError::NotAuthorized)` - caller may not update the team
/// - `Err(AccessError::ProtectedField)` - attempt to change `id` or
///   `primary_owner_identity`
/// - `Err(AccessError::Conflict)` - the new slug is taken
pub async fn update(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    team_id: Uuid,
    changes: TeamUpdate,
    now: DateTime<Utc>,
) -> Result<Team, AccessError> {
    Authorizer::require(tx, caller, team_id, Role::Owner).await?;

    if changes.private_metadata.is_some() && !caller.is_service {
        return Err(AccessError::not_authorized(
            "private metadata can only be set by a service caller",
        ));
    }

    let current = load(tx, team_id).await?;
    let mut next = current.clone();

    if let Some(name) = changes.name {
        next.name = Some(name);
    }

    if let Some(raw) = changes.slug {
        let slug = normalize_slug(&raw);
        if current.slug.as_deref() != Some(slug.as_str()) {
            ensure_slug_free(tx, &slug, Some(team_id)).await?;
        }
        next.slug = Some(slug).filter(|s| !s.is_empty());
    }

    if let Some(metadata) = changes.public_metadata {
        next.public_metadata = if changes.replace_metadata {
            metadata
        } else {
            merge_metadata(current.public_metadata.clone(), metadata)
        };
    }

    if let Some(metadata) = changes.private_metadata {
        next.private_metadata = metadata;
    }

    next.id = changes.id.unwrap_or(current.id);
    next.primary_owner_identity = changes
        .primary_owner_identity
        .unwrap_or(current.primary_owner_identity);
    next.updated_at = now;
    next.updated_by = caller.identity;

    guard_protected_fields(&current, &next)?;

    tx.update_team(&next).await
}

/// Rejects any change to fields that only creation or an ownership transfer
/// may set. Runs for every caller, service included.
pub fn guard_protected_fields(before: &Team, after: &Team) -> Result<(), AccessError> {
    if after.id != before.id {
        return Err(AccessError::ProtectedField("id"));
    }
    if after.primary_owner_identity != before.primary_owner_identity {
        return Err(AccessError::ProtectedField("primary_owner_identity"));
    }
    Ok(())
}

/// Fetches a team visible to the caller: members, the primary owner and
/// service callers. Everyone else gets `NotFound`.
pub async fn get(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    team_id: Uuid,
) -> Result<Team, AccessError> {
    let team = load(tx, team_id).await?;

    if caller.is_service || team.primary_owner_identity == caller.identity {
        return Ok(team);
    }

    if Authorizer::check(tx, caller, team_id, None).await? {
        Ok(team)
    } else {
        Err(team_not_found())
    }
}

/// Resolves a slug (normalized first) and applies the visibility rules of [`get`].
pub async fn get_by_slug(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    slug: &str,
) -> Result<Team, AccessError> {
    let team = tx
        .find_team_by_slug(&normalize_slug(slug))
        .await?
        .ok_or_else(team_not_found)?;

    get(tx, caller, team.id).await
}

/// Teams the caller is a member of, oldest first.
pub async fn list_for_caller(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
) -> Result<Vec<TeamSummary>, AccessError> {
    let memberships = tx.memberships_for_user(caller.identity).await?;
    let mut summaries = Vec::with_capacity(memberships.len());

    for m in memberships {
        // orphaned memberships are skipped
        let Some(team) = tx.find_team(m.team_id).await? else {
            log::warn!(
                target: "teamward",
                "msg=\"membership references missing team\", team_id={}, identity={}",
                m.team_id,
                m.user_identity
            );
            continue;
        };

        summaries.push(TeamSummary {
            team_id: team.id,
            is_primary_owner: team.primary_owner_identity == caller.identity,
            name: team.name,
            slug: team.slug,
            role: m.role,
            created_at: team.created_at,
            updated_at: team.updated_at,
        });
    }

    summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.team_id.cmp(&b.team_id)));
    Ok(summaries)
}

/// Loads a team without any visibility check.
pub(crate) async fn load(tx: &mut dyn TeamTransaction, team_id: Uuid) -> Result<Team, AccessError> {
    tx.find_team(team_id).await?.ok_or_else(team_not_found)
}

pub(crate) fn team_not_found() -> AccessError {
    AccessError::not_found("Team not found")
}

async fn ensure_slug_free(
    tx: &mut dyn TeamTransaction,
    slug: &str,
    except: Option<Uuid>,
) -> Result<(), AccessError> {
    match tx.find_team_by_slug(slug).await? {
        Some(existing) if Some(existing.id) != except => Err(AccessError::Conflict(format!(
            "slug `{slug}` is already in use"
        ))),
        _ => Ok(()),
    }
}

/// Shallow merge: top-level keys of `patch` overwrite those of `base`. A
/// non-object on either side is replaced by `patch`.
fn merge_metadata(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base), Value::Object(patch)) => {
            base.extend(patch);
            Value::Object(base)
        }
        (_, patch) => patch,
    }
}
