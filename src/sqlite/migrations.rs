//! Embedded `SQLite` migrations.
//!
//! The SQL lives in `migrations_sqlite/teams/` and is compiled into the
//! binary. Applied migrations are tracked in `_teamward_migrations`, so
//! [`run`] is safe to call on every start-up.
//!
//! # Example
//!
//! ```rust,ignore
//! use teamward::sqlite::{SqliteTeamStore, migrations};
//! use sqlx::SqlitePool;
//!
//! async fn setup(pool: SqlitePool) -> Result<SqliteTeamStore, sqlx::Error> {
//!     migrations::run(&pool).await?;
//!     Ok(SqliteTeamStore::new(pool))
//! }
//! ```

use sqlx::{Executor, SqlitePool};

const TEAMS_MIGRATIONS: &[(&str, &str)] = &[
    (
        "20250301000001_create_teams_table",
        include_str!("../../migrations_sqlite/teams/20250301000001_create_teams_table.sql"),
    ),
    (
        "20250301000002_create_team_memberships_table",
        include_str!(
            "../../migrations_sqlite/teams/20250301000002_create_team_memberships_table.sql"
        ),
    ),
    (
        "20250301000003_create_team_invitations_table",
        include_str!(
            "../../migrations_sqlite/teams/20250301000003_create_team_invitations_table.sql"
        ),
    ),
];

/// Applies every migration not yet recorded, in order.
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    pool.execute(
        r"
        CREATE TABLE IF NOT EXISTS _teamward_migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )
        ",
    )
    .await?;

    run_migrations(pool, TEAMS_MIGRATIONS).await
}

/// Statements are split on `;`, so migration SQL must not contain
/// semicolons inside string literals.
async fn run_migrations(pool: &SqlitePool, migrations: &[(&str, &str)]) -> Result<(), sqlx::Error> {
    for (name, sql) in migrations {
        let applied: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _teamward_migrations WHERE name = ?)")
                .bind(*name)
                .fetch_one(pool)
                .await?;

        if applied {
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO _teamward_migrations (name) VALUES (?)")
            .bind(*name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        log::info!(target: "teamward", "msg=\"migration applied\", name=\"{name}\"");
    }
    Ok(())
}
