use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

// Append only. Applied versions are recorded in `schema_migrations`.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        statements: &[
            r"
            CREATE TABLE IF NOT EXISTS lesson_progress (
                lesson_id TEXT PRIMARY KEY,
                completed INTEGER NOT NULL CHECK (completed IN (0, 1)),
                score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
                attempts INTEGER NOT NULL CHECK (attempts > 0),
                time_spent_secs INTEGER NOT NULL CHECK (time_spent_secs >= 0),
                completed_at TEXT NOT NULL
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_lesson_progress_completed_at
                ON lesson_progress (completed_at)
            ",
        ],
    },
    // JSON array of UTC dates; rows from v1 fall back to the day of `completed_at`.
    Migration {
        version: 2,
        statements: &[r"
            ALTER TABLE lesson_progress
                ADD COLUMN completion_days TEXT NOT NULL DEFAULT '[]'
            "],
    },
];

pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    let applied: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_migrations")
        .fetch_all(pool)
        .await?;

    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
        apply(pool, migration)
            .await
            .map_err(|source| SqliteInitError::Migration {
                version: migration.version,
                source,
            })?;
        tracing::info!(version = migration.version, "applied sqlite migration");
    }

    Ok(())
}

async fn apply(pool: &SqlitePool, migration: &Migration) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in migration.statements.iter().copied() {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
        .bind(migration.version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    tx.commit().await
}
