//! Team-scoped authorization core.
//!
//! `teamward` decides which identities may read or mutate which teams, keeps
//! every team attached to exactly one primary owner, and runs the invitation
//! token workflow used to add new members. All operations go through
//! [`AccessGateway`], which runs each call inside a single store transaction.
//!
//! # Example
//!
//! ```rust
//! use teamward::{AccessGateway, Caller, MemoryTeamStore};
//! use teamward::teams::{CreateTeamInput, InvitationKind, Role};
//! use uuid::Uuid;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gateway = AccessGateway::new(MemoryTeamStore::new());
//! let alice = Caller::user(Uuid::new_v4());
//!
//! let team = gateway
//!     .create_team(&alice, CreateTeamInput::named("Acme"))
//!     .await
//!     .unwrap();
//!
//! let invitation = gateway
//!     .create_invitation(&alice, team.id, Role::Member, InvitationKind::SingleUse)
//!     .await
//!     .unwrap();
//!
//! let bob = Caller::user(Uuid::new_v4());
//! let accepted = gateway
//!     .accept_invitation(&bob, &invitation.token)
//!     .await
//!     .unwrap();
//! assert_eq!(accepted.team_id, team.id);
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod events;
pub mod gateway;
pub mod identity;
pub mod memory;
mod secret;
#[cfg(feature = "sqlx_sqlite")]
pub mod sqlite;
pub mod teams;

pub use config::{AccessConfig, InvitationConfig};
pub use events::EventBus;
pub use gateway::AccessGateway;
pub use identity::Caller;
pub use memory::MemoryTeamStore;
pub use secret::SecretString;

/// Errors returned by every access-control operation.
///
/// `NotFound` covers both absent rows and rows the caller may not see.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("You are already a member of this account")]
    AlreadyMember,
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("field `{0}` cannot be changed directly")]
    ProtectedField(&'static str),
    #[error("database error: {0}")]
    Database(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AccessError {
    pub(crate) fn not_authorized(reason: impl Into<String>) -> Self {
        Self::NotAuthorized(reason.into())
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Returns true for the errors a caller could fix by changing the request
    /// rather than retrying it.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Database(_) | Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AccessError::not_found("Invitation not found").to_string(),
            "Invitation not found"
        );
        assert_eq!(
            AccessError::AlreadyMember.to_string(),
            "You are already a member of this account"
        );
        assert_eq!(
            AccessError::ProtectedField("id").to_string(),
            "field `id` cannot be changed directly"
        );
    }

    #[test]
    fn test_is_client_error() {
        assert!(AccessError::AlreadyMember.is_client_error());
        assert!(AccessError::not_authorized("nope").is_client_error());
        assert!(!AccessError::Database("locked".to_owned()).is_client_error());
        assert!(!AccessError::Internal("poisoned".to_owned()).is_client_error());
    }
}
