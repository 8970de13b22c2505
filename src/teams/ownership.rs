//! Ownership transfer protocol: validated role changes and primary-owner
//! hand-over.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::authorizer::Authorizer;
use super::store::TeamTransaction;
use super::types::RoleInfo;
use super::{Role, directory, membership};
use crate::{AccessError, Caller};

/// Outcome of [`update_team_user_role`], used for logging and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChange {
    pub info: RoleInfo,
    /// Previous primary owner when the call transferred primary ownership.
    pub transferred_from: Option<Uuid>,
}

/// Changes `target`'s role on a team and optionally makes them primary owner.
///
/// Steps, all inside `tx`:
/// 1. the caller must hold exact `owner` membership;
/// 2. demoting the primary owner is refused (`NotAuthorized` for anyone but
///    the primary owner, `InvariantViolation` for the primary owner, who has
///    to transfer first);
/// 3. with `make_primary`, the caller must be the current primary owner and
///    `new_role` must be `owner`;
/// 4. the role is written;
/// 5. with `make_primary`, the primary owner is swapped by compare-and-set
///    on the caller's identity. A lost race fails `NotAuthorized`.
pub async fn update_team_user_role(
    tx: &mut dyn TeamTransaction,
    caller: &Caller,
    team_id: Uuid,
    target: Uuid,
    new_role: Role,
    make_primary: bool,
    now: DateTime<Utc>,
) -> Result<RoleChange, AccessError> {
    Authorizer::require(tx, caller, team_id, Role::Owner).await?;
    let team = directory::load(tx, team_id).await?;
    let caller_is_primary = !caller.is_service && team.primary_owner_identity == caller.identity;

    if target == team.primary_owner_identity && new_role != Role::Owner {
        if !caller_is_primary {
            return Err(AccessError::not_authorized(
                "must be primary owner to change the primary owner",
            ));
        }
        return Err(AccessError::InvariantViolation(
            "transfer primary ownership before changing your own role".to_owned(),
        ));
    }

    if make_primary {
        if !caller_is_primary {
            return Err(AccessError::not_authorized(
                "only the primary owner can transfer primary ownership",
            ));
        }
        if new_role != Role::Owner {
            return Err(AccessError::InvariantViolation(
                "the primary owner must hold the owner role".to_owned(),
            ));
        }
    }

    membership::set_role(tx, &team, target, new_role, now).await?;

    let mut transferred_from = None;
    if make_primary && target != team.primary_owner_identity {
        let swapped = tx
            .set_primary_owner(team_id, caller.identity, target, caller.identity, now)
            .await?;

        if !swapped {
            log::warn!(
                target: "teamward",
                "msg=\"primary owner changed concurrently\", team_id={team_id}, identity={}",
                caller.identity
            );
            return Err(AccessError::not_authorized(
                "only the primary owner can transfer primary ownership",
            ));
        }
        transferred_from = Some(caller.identity);
    }

    Ok(RoleChange {
        info: RoleInfo {
            role: new_role,
            is_primary_owner: make_primary || target == team.primary_owner_identity,
        },
        transferred_from,
    })
}
