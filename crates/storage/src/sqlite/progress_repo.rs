use tutor_core::model::{LessonId, LessonProgress};

use super::{
    SqliteRepository,
    mapping::{days_to_json, map_progress_row, secs_to_i64},
};
use crate::repository::{ProgressRepository, StorageError};

const UPSERT_PROGRESS: &str = r"
    INSERT INTO lesson_progress (
        lesson_id, completed, score, attempts, time_spent_secs, completed_at, completion_days
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(lesson_id) DO UPDATE SET
        completed = excluded.completed,
        score = excluded.score,
        attempts = excluded.attempts,
        time_spent_secs = excluded.time_spent_secs,
        completed_at = excluded.completed_at,
        completion_days = excluded.completion_days
";

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self) -> Result<Vec<LessonProgress>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT lesson_id, completed, score, attempts, time_spent_secs, completed_at,
                       completion_days
                FROM lesson_progress
                ORDER BY lesson_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progress_row(&row)?);
        }
        Ok(out)
    }

    async fn save_progress(&self, records: &[LessonProgress]) -> Result<(), StorageError> {
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        if !records.iter().all(|r| seen.insert(r.lesson_id())) {
            return Err(StorageError::Conflict);
        }

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("DELETE FROM lesson_progress")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for record in records {
            sqlx::query(UPSERT_PROGRESS)
                .bind(record.lesson_id().as_str())
                .bind(record.completed())
                .bind(i64::from(record.score()))
                .bind(i64::from(record.attempts()))
                .bind(secs_to_i64(record.time_spent_secs())?)
                .bind(record.completed_at())
                .bind(days_to_json(record)?)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(records = records.len(), "progress saved");
        Ok(())
    }

    async fn upsert_progress(&self, record: &LessonProgress) -> Result<(), StorageError> {
        sqlx::query(UPSERT_PROGRESS)
            .bind(record.lesson_id().as_str())
            .bind(record.completed())
            .bind(i64::from(record.score()))
            .bind(i64::from(record.attempts()))
            .bind(secs_to_i64(record.time_spent_secs())?)
            .bind(record.completed_at())
            .bind(days_to_json(record)?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn get_progress(&self, id: &LessonId) -> Result<LessonProgress, StorageError> {
        let row = sqlx::query(
            r"
                SELECT lesson_id, completed, score, attempts, time_spent_secs, completed_at,
                       completion_days
                FROM lesson_progress
                WHERE lesson_id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_progress_row(&row)
    }
}
