use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use uuid::Uuid;

use super::{database_error, is_foreign_key_violation, is_unique_violation};
use crate::AccessError;
use crate::teams::{CreateInvitation, InvitationPage, TeamInvitation};

#[derive(FromRow)]
struct InvitationRecord {
    id: Uuid,
    team_id: Uuid,
    role: String,
    token_hash: String,
    invited_by_identity: Uuid,
    team_name_snapshot: Option<String>,
    invitation_kind: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvitationRecord> for TeamInvitation {
    type Error = AccessError;

    fn try_from(row: InvitationRecord) -> Result<Self, Self::Error> {
        Ok(TeamInvitation {
            id: row.id,
            team_id: row.team_id,
            role: row.role.parse()?,
            token_hash: row.token_hash,
            invited_by_identity: row.invited_by_identity,
            team_name_snapshot: row.team_name_snapshot,
            kind: row.invitation_kind.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(team_id = %data.team_id), err))]
pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    data: CreateInvitation,
) -> Result<TeamInvitation, AccessError> {
    let row: InvitationRecord = sqlx::query_as(
        r"
        INSERT INTO team_invitations (id, team_id, role, token_hash, invited_by_identity,
                                      team_name_snapshot, invitation_kind, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, team_id, role, token_hash, invited_by_identity, team_name_snapshot,
                  invitation_kind, created_at, updated_at
        ",
    )
    .bind(data.id)
    .bind(data.team_id)
    .bind(data.role.as_str())
    .bind(&data.token_hash)
    .bind(data.invited_by_identity)
    .bind(&data.team_name_snapshot)
    .bind(data.kind.as_str())
    .bind(data.created_at)
    .bind(data.created_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AccessError::Conflict("invitation token collision".to_owned())
        } else if is_foreign_key_violation(&e) {
            AccessError::not_found("Team not found")
        } else {
            database_error("insert_invitation", &e)
        }
    })?;

    row.try_into()
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn find(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<TeamInvitation>, AccessError> {
    let row: Option<InvitationRecord> = sqlx::query_as(
        r"
        SELECT id, team_id, role, token_hash, invited_by_identity, team_name_snapshot,
               invitation_kind, created_at, updated_at
        FROM team_invitations WHERE id = ?
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| database_error("find_invitation", &e))?;

    row.map(TryInto::try_into).transpose()
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, err))]
pub(crate) async fn find_by_token_hash(
    conn: &mut SqliteConnection,
    token_hash: &str,
) -> Result<Option<TeamInvitation>, AccessError> {
    let row: Option<InvitationRecord> = sqlx::query_as(
        r"
        SELECT id, team_id, role, token_hash, invited_by_identity, team_name_snapshot,
               invitation_kind, created_at, updated_at
        FROM team_invitations WHERE token_hash = ?
        ",
    )
    .bind(token_hash)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| database_error("find_invitation_by_token_hash", &e))?;

    row.map(TryInto::try_into).transpose()
}

/// Newest first. `created_after` is exclusive and already includes the
/// expiry cutoff.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn list(
    conn: &mut SqliteConnection,
    page: InvitationPage,
) -> Result<Vec<TeamInvitation>, AccessError> {
    let rows: Vec<InvitationRecord> = sqlx::query_as(
        r"
        SELECT id, team_id, role, token_hash, invited_by_identity, team_name_snapshot,
               invitation_kind, created_at, updated_at
        FROM team_invitations
        WHERE team_id = ? AND created_at > ? AND (? IS NULL OR created_at < ?)
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        ",
    )
    .bind(page.team_id)
    .bind(page.created_after)
    .bind(page.created_before)
    .bind(page.created_before)
    .bind(i64::from(page.limit))
    .bind(i64::from(page.offset))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| database_error("list_invitations", &e))?;

    rows.into_iter().map(TryInto::try_into).collect()
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<bool, AccessError> {
    let result = sqlx::query("DELETE FROM team_invitations WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| database_error("delete_invitation", &e))?;

    Ok(result.rows_affected() > 0)
}
