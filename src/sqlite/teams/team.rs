use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, SqliteConnection};
use uuid::Uuid;

use super::{database_error, is_unique_violation};
use crate::AccessError;
use crate::teams::{CreateTeam, Team};

#[derive(FromRow)]
struct TeamRecord {
    id: Uuid,
    primary_owner_identity: Uuid,
    name: Option<String>,
    slug: Option<String>,
    private_metadata: Json<Value>,
    public_metadata: Json<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Uuid,
    updated_by: Uuid,
}

impl From<TeamRecord> for Team {
    fn from(row: TeamRecord) -> Self {
        Team {
            id: row.id,
            primary_owner_identity: row.primary_owner_identity,
            name: row.name,
            slug: row.slug,
            private_metadata: row.private_metadata.0,
            public_metadata: row.public_metadata.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
        }
    }
}

fn slug_conflict(slug: Option<&str>) -> AccessError {
    AccessError::Conflict(format!(
        "slug `{}` is already in use",
        slug.unwrap_or_default()
    ))
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    data: CreateTeam,
) -> Result<Team, AccessError> {
    let row: TeamRecord = sqlx::query_as(
        r"
        INSERT INTO teams (id, primary_owner_identity, name, slug, private_metadata,
                           public_metadata, created_at, updated_at, created_by, updated_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, primary_owner_identity, name, slug, private_metadata, public_metadata,
                  created_at, updated_at, created_by, updated_by
        ",
    )
    .bind(data.id)
    .bind(data.primary_owner_identity)
    .bind(&data.name)
    .bind(&data.slug)
    .bind(Json(&data.private_metadata))
    .bind(Json(&data.public_metadata))
    .bind(data.created_at)
    .bind(data.created_at)
    .bind(data.primary_owner_identity)
    .bind(data.primary_owner_identity)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            slug_conflict(data.slug.as_deref())
        } else {
            database_error("insert_team", &e)
        }
    })?;

    Ok(row.into())
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn find(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Team>, AccessError> {
    let row: Option<TeamRecord> = sqlx::query_as(
        r"
        SELECT id, primary_owner_identity, name, slug, private_metadata, public_metadata,
               created_at, updated_at, created_by, updated_by
        FROM teams WHERE id = ?
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| database_error("find_team", &e))?;

    Ok(row.map(Into::into))
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn find_by_slug(
    conn: &mut SqliteConnection,
    slug: &str,
) -> Result<Option<Team>, AccessError> {
    let row: Option<TeamRecord> = sqlx::query_as(
        r"
        SELECT id, primary_owner_identity, name, slug, private_metadata, public_metadata,
               created_at, updated_at, created_by, updated_by
        FROM teams WHERE slug = ?
        ",
    )
    .bind(slug)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| database_error("find_team_by_slug", &e))?;

    Ok(row.map(Into::into))
}

/// Writes the mutable columns only. `id`, `primary_owner_identity` and the
/// `created_*` columns are never touched here.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn, team), fields(team_id = %team.id), err))]
pub(crate) async fn update(conn: &mut SqliteConnection, team: &Team) -> Result<Team, AccessError> {
    let row: TeamRecord = sqlx::query_as(
        r"
        UPDATE teams
        SET name = ?, slug = ?, public_metadata = ?, private_metadata = ?,
            updated_at = ?, updated_by = ?
        WHERE id = ?
        RETURNING id, primary_owner_identity, name, slug, private_metadata, public_metadata,
                  created_at, updated_at, created_by, updated_by
        ",
    )
    .bind(&team.name)
    .bind(&team.slug)
    .bind(Json(&team.public_metadata))
    .bind(Json(&team.private_metadata))
    .bind(team.updated_at)
    .bind(team.updated_by)
    .bind(team.id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => AccessError::not_found("Team not found"),
        ref e if is_unique_violation(e) => slug_conflict(team.slug.as_deref()),
        _ => database_error("update_team", &e),
    })?;

    Ok(row.into())
}

/// Compare-and-set on `primary_owner_identity`. Returns false when the
/// current primary owner is no longer `expected`.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(conn), err))]
pub(crate) async fn set_primary_owner(
    conn: &mut SqliteConnection,
    team_id: Uuid,
    expected: Uuid,
    new_owner: Uuid,
    updated_by: Uuid,
    at: DateTime<Utc>,
) -> Result<bool, AccessError> {
    let result = sqlx::query(
        r"
        UPDATE teams
        SET primary_owner_identity = ?, updated_by = ?, updated_at = ?
        WHERE id = ? AND primary_owner_identity = ?
        ",
    )
    .bind(new_owner)
    .bind(updated_by)
    .bind(at)
    .bind(team_id)
    .bind(expected)
    .execute(&mut *conn)
    .await
    .map_err(|e| database_error("set_primary_owner", &e))?;

    Ok(result.rows_affected() == 1)
}
