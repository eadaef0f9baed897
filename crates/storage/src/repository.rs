use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tutor_core::model::{LessonId, LessonProgress};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("no progress recorded for that lesson")]
    NotFound,

    #[error("more than one progress record for the same lesson")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the learner's lesson progress.
///
/// Backends store at most one record per lesson id.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load every stored record, ordered by lesson id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be read or decoded.
    async fn load_progress(&self) -> Result<Vec<LessonProgress>, StorageError>;

    /// Replace all stored records with `records`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `records` holds two entries for the same
    /// lesson, or other storage errors.
    async fn save_progress(&self, records: &[LessonProgress]) -> Result<(), StorageError>;

    /// Insert or replace the record for one lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(&self, record: &LessonProgress) -> Result<(), StorageError>;

    /// Fetch the record for one lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no record.
    async fn get_progress(&self, id: &LessonId) -> Result<LessonProgress, StorageError>;
}

/// Process-local progress store; contents vanish with the last clone.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<LessonId, LessonProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<_> = guard.values().cloned().collect();
        records.sort_by(|a, b| a.lesson_id().cmp(b.lesson_id()));
        Ok(records)
    }

    async fn save_progress(&self, records: &[LessonProgress]) -> Result<(), StorageError> {
        let mut replacement = HashMap::with_capacity(records.len());
        for record in records {
            if replacement
                .insert(record.lesson_id().clone(), record.clone())
                .is_some()
            {
                return Err(StorageError::Conflict);
            }
        }
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = replacement;
        Ok(())
    }

    async fn upsert_progress(&self, record: &LessonProgress) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(record.lesson_id().clone(), record.clone());
        Ok(())
    }

    async fn get_progress(&self, id: &LessonId) -> Result<LessonProgress, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }
}

/// The progress backend selected at startup.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::time::fixed_now;

    fn record(raw: &str, score: u32) -> LessonProgress {
        LessonProgress::new(LessonId::new(raw).unwrap(), score, 1, 120, fixed_now()).unwrap()
    }

    #[tokio::test]
    async fn upsert_replaces_existing_record() {
        let repo = InMemoryRepository::new();
        repo.upsert_progress(&record("L002", 60)).await.unwrap();
        repo.upsert_progress(&record("L001", 70)).await.unwrap();
        repo.upsert_progress(&record("L002", 95)).await.unwrap();

        let loaded = repo.load_progress().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].lesson_id().as_str(), "L001");
        assert_eq!(loaded[1].score(), 95);
    }

    #[tokio::test]
    async fn save_replaces_everything() {
        let repo = InMemoryRepository::new();
        repo.upsert_progress(&record("L009", 60)).await.unwrap();
        repo.save_progress(&[record("L001", 80)]).await.unwrap();

        let loaded = repo.load_progress().await.unwrap();
        assert_eq!(loaded, vec![record("L001", 80)]);
    }

    #[tokio::test]
    async fn save_rejects_duplicates_and_keeps_old_state() {
        let repo = InMemoryRepository::new();
        repo.upsert_progress(&record("L009", 60)).await.unwrap();
        let err = repo
            .save_progress(&[record("L001", 80), record("L001", 90)])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        assert_eq!(repo.load_progress().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let storage = Storage::in_memory();
        let err = storage
            .progress
            .get_progress(&LessonId::new("L404").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
