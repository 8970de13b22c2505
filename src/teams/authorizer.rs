//! Per-operation authorization checks.
//!
//! Every team-scoped operation calls [`Authorizer::check`] (or
//! [`Authorizer::require`]) before touching anything. The decision itself is
//! made by [`Authorizer::permits`], which is pure and does no I/O.

use uuid::Uuid;

use super::Role;
use super::store::TeamTransaction;
use super::types::TeamMembership;
use crate::{AccessError, Caller};

/// Team-scoped role checks with exact-match semantics.
///
/// A caller holding `owner` does **not** satisfy a check for `member`: the
/// stored role must equal the requested one. A service caller satisfies
/// every check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authorizer;

impl Authorizer {
    /// Decides a check from the caller's membership row.
    ///
    /// `required = None` only asks for any membership.
    pub fn permits(
        caller: &Caller,
        membership: Option<&TeamMembership>,
        required: Option<Role>,
    ) -> bool {
        if caller.is_service {
            return true;
        }

        match (membership, required) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(row), Some(role)) => row.role == role,
        }
    }

    /// Reads the caller's membership inside `tx` and applies [`Self::permits`].
    pub async fn check(
        tx: &mut dyn TeamTransaction,
        caller: &Caller,
        team_id: Uuid,
        required: Option<Role>,
    ) -> Result<bool, AccessError> {
        if caller.is_service {
            return Ok(true);
        }

        let membership = tx.find_membership(team_id, caller.identity).await?;
        Ok(Self::permits(caller, membership.as_ref(), required))
    }

    /// Like [`Self::check`], failing with [`AccessError::NotAuthorized`].
    pub async fn require(
        tx: &mut dyn TeamTransaction,
        caller: &Caller,
        team_id: Uuid,
        required: Role,
    ) -> Result<(), AccessError> {
        if Self::check(tx, caller, team_id, Some(required)).await? {
            Ok(())
        } else {
            log::debug!(
                target: "teamward",
                "msg=\"authorization denied\", team_id={team_id}, identity={}, required={required}",
                caller.identity
            );
            Err(AccessError::not_authorized(format!(
                "{required} role required on this team"
            )))
        }
    }
}
