use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use tutor_core::model::{LessonId, LessonProgress};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range: {v}")))
}

pub(crate) fn secs_to_i64(secs: u64) -> Result<i64, StorageError> {
    i64::try_from(secs).map_err(|_| StorageError::Serialization("time_spent_secs overflow".into()))
}

pub(crate) fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<LessonProgress, StorageError> {
    let lesson_id = LessonId::new(row.try_get::<String, _>("lesson_id").map_err(ser)?).map_err(ser)?;
    let completed: bool = row.try_get("completed").map_err(ser)?;
    let score = i64_to_u32("score", row.try_get("score").map_err(ser)?)?;
    let attempts = i64_to_u32("attempts", row.try_get("attempts").map_err(ser)?)?;
    let time_spent: i64 = row.try_get("time_spent_secs").map_err(ser)?;
    let time_spent_secs = u64::try_from(time_spent)
        .map_err(|_| StorageError::Serialization(format!("negative time_spent_secs: {time_spent}")))?;
    let completed_at: DateTime<Utc> = row.try_get("completed_at").map_err(ser)?;
    let days: Vec<NaiveDate> =
        serde_json::from_str(&row.try_get::<String, _>("completion_days").map_err(ser)?)
            .map_err(ser)?;

    LessonProgress::from_persisted(
        lesson_id,
        completed,
        score,
        attempts,
        time_spent_secs,
        completed_at,
    )
    .map(|record| record.with_completion_days(days))
    .map_err(ser)
}

pub(crate) fn days_to_json(record: &LessonProgress) -> Result<String, StorageError> {
    serde_json::to_string(record.completion_days()).map_err(ser)
}
