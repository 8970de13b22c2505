use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use uuid::Uuid;

use super::{database_error, is_foreign_key_violation, is_unique_violation};
use crate::AccessError;
use crate::teams::{CreateMembership, TeamMembership};

#[derive(FromRow)]
struct MembershipRecord {
    team_id: Uuid,
    user_identity: Uuid,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MembershipRecord> for TeamMembership {
    type Error = AccessError;

    fn try_from(row: MembershipRecord) -> Result<Self, Self::Error> {
        Ok(TeamMembership {
            team_id: row.team_id,
            user_identity: row.user_identity,
            role: row.role.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect(rows: Vec<MembershipRecord>) -> Result<Vec<TeamMembership>, AccessError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn find(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_identity: Uuid,
) -> Result<Option<TeamMembership>, AccessError> {
    let row: Option<MembershipRecord> = sqlx::query_as(
        r"
        SELECT team_id, user_identity, role, created_at, updated_at
        FROM team_memberships WHERE team_id = ? AND user_identity = ?
        ",
    )
    .bind(team_id)
    .bind(user_identity)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| database_error("find_membership", &e))?;

    row.map(TryInto::try_into).transpose()
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn for_user(
    conn: &mut SqliteConnection,
    user_identity: Uuid,
) -> Result<Vec<TeamMembership>, AccessError> {
    let rows: Vec<MembershipRecord> = sqlx::query_as(
        r"
        SELECT team_id, user_identity, role, created_at, updated_at
        FROM team_memberships WHERE user_identity = ? ORDER BY created_at ASC
        ",
    )
    .bind(user_identity)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| database_error("memberships_for_user", &e))?;

    collect(rows)
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn for_team(
    conn: &mut SqliteConnection,
    team_id: Uuid,
) -> Result<Vec<TeamMembership>, AccessError> {
    let rows: Vec<MembershipRecord> = sqlx::query_as(
        r"
        SELECT team_id, user_identity, role, created_at, updated_at
        FROM team_memberships WHERE team_id = ? ORDER BY created_at ASC
        ",
    )
    .bind(team_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| database_error("memberships_for_team", &e))?;

    collect(rows)
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    data: CreateMembership,
) -> Result<TeamMembership, AccessError> {
    let row: MembershipRecord = sqlx::query_as(
        r"
        INSERT INTO team_memberships (team_id, user_identity, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING team_id, user_identity, role, created_at, updated_at
        ",
    )
    .bind(data.team_id)
    .bind(data.user_identity)
    .bind(data.role.as_str())
    .bind(data.created_at)
    .bind(data.created_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AccessError::AlreadyMember
        } else if is_foreign_key_violation(&e) {
            AccessError::not_found("Team not found")
        } else {
            database_error("insert_membership", &e)
        }
    })?;

    row.try_into()
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn upsert(
    conn: &mut SqliteConnection,
    data: CreateMembership,
) -> Result<TeamMembership, AccessError> {
    let row: MembershipRecord = sqlx::query_as(
        r"
        INSERT INTO team_memberships (team_id, user_identity, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (team_id, user_identity)
        DO UPDATE SET role = excluded.role, updated_at = excluded.updated_at
        RETURNING team_id, user_identity, role, created_at, updated_at
        ",
    )
    .bind(data.team_id)
    .bind(data.user_identity)
    .bind(data.role.as_str())
    .bind(data.created_at)
    .bind(data.created_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            AccessError::not_found("Team not found")
        } else {
            database_error("upsert_membership", &e)
        }
    })?;

    row.try_into()
}

/// Deletes the row unless `user_identity` is the team's primary owner. The
/// check runs inside the statement.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn delete_unless_primary(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    user_identity: Uuid,
) -> Result<bool, AccessError> {
    let result = sqlx::query(
        r"
        DELETE FROM team_memberships
        WHERE team_id = ? AND user_identity = ?
          AND NOT EXISTS (
              SELECT 1 FROM teams WHERE id = ? AND primary_owner_identity = ?
          )
        ",
    )
    .bind(team_id)
    .bind(user_identity)
    .bind(team_id)
    .bind(user_identity)
    .execute(&mut *conn)
    .await
    .map_err(|e| database_error("delete_membership", &e))?;

    Ok(result.rows_affected() > 0)
}
