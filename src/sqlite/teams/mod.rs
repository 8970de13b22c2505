//! Row mapping and queries, one file per table. Every function runs on the
//! connection of an open transaction.

pub(super) mod invitation;
pub(super) mod membership;
pub(super) mod team;

use crate::AccessError;

pub(super) fn database_error(operation: &str, e: &sqlx::Error) -> AccessError {
    log::error!(target: "teamward", "msg=\"database error\", operation=\"{operation}\", error=\"{e}\"");
    AccessError::Database(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|d| d.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|d| d.is_foreign_key_violation())
}
