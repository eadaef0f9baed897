//! Progress kept in a single JSON document on disk.
//!
//! Every write rewrites the whole file through a temporary sibling and a rename,
//! so a crash leaves either the old or the new document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tutor_core::model::{LessonId, LessonProgress};

use crate::repository::{ProgressRepository, Storage, StorageError};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ProgressDocument {
    version: u32,
    #[serde(default)]
    progress: Vec<StoredProgress>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredProgress {
    lesson_id: String,
    completed: bool,
    score: u32,
    attempts: u32,
    time_spent_secs: u64,
    completed_at: DateTime<Utc>,
    #[serde(default)]
    completion_days: Vec<NaiveDate>,
}

impl From<&LessonProgress> for StoredProgress {
    fn from(record: &LessonProgress) -> Self {
        Self {
            lesson_id: record.lesson_id().as_str().to_owned(),
            completed: record.completed(),
            score: u32::from(record.score()),
            attempts: record.attempts(),
            time_spent_secs: record.time_spent_secs(),
            completed_at: record.completed_at(),
            completion_days: record.completion_days().iter().copied().collect(),
        }
    }
}

impl TryFrom<StoredProgress> for LessonProgress {
    type Error = StorageError;

    fn try_from(stored: StoredProgress) -> Result<Self, Self::Error> {
        let lesson_id = LessonId::new(stored.lesson_id).map_err(ser)?;
        LessonProgress::from_persisted(
            lesson_id,
            stored.completed,
            stored.score,
            stored.attempts,
            stored.time_spent_secs,
            stored.completed_at,
        )
        .map(|record| record.with_completion_days(stored.completion_days))
        .map_err(ser)
    }
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn io(e: std::io::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// File-backed progress repository. A missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<BTreeMap<LessonId, LessonProgress>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(io(e)),
        };
        let doc: ProgressDocument = serde_json::from_str(&raw).map_err(ser)?;
        if doc.version != FORMAT_VERSION {
            return Err(StorageError::Serialization(format!(
                "unsupported progress file version {}",
                doc.version
            )));
        }

        let mut records = BTreeMap::new();
        for stored in doc.progress {
            let record = LessonProgress::try_from(stored)?;
            if records.insert(record.lesson_id().clone(), record).is_some() {
                return Err(StorageError::Conflict);
            }
        }
        Ok(records)
    }

    async fn write(&self, records: &BTreeMap<LessonId, LessonProgress>) -> Result<(), StorageError> {
        let doc = ProgressDocument {
            version: FORMAT_VERSION,
            progress: records.values().map(StoredProgress::from).collect(),
        };
        let json = serde_json::to_string_pretty(&doc).map_err(ser)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io)?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "progress file written");
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for JsonFileRepository {
    async fn load_progress(&self) -> Result<Vec<LessonProgress>, StorageError> {
        let _guard = self.guard.lock().await;
        Ok(self.read().await?.into_values().collect())
    }

    async fn save_progress(&self, records: &[LessonProgress]) -> Result<(), StorageError> {
        let mut replacement = BTreeMap::new();
        for record in records {
            if replacement
                .insert(record.lesson_id().clone(), record.clone())
                .is_some()
            {
                return Err(StorageError::Conflict);
            }
        }
        let _guard = self.guard.lock().await;
        self.write(&replacement).await
    }

    async fn upsert_progress(&self, record: &LessonProgress) -> Result<(), StorageError> {
        let _guard = self.guard.lock().await;
        let mut records = self.read().await?;
        records.insert(record.lesson_id().clone(), record.clone());
        self.write(&records).await
    }

    async fn get_progress(&self, id: &LessonId) -> Result<LessonProgress, StorageError> {
        let _guard = self.guard.lock().await;
        self.read().await?.remove(id).ok_or(StorageError::NotFound)
    }
}

impl Storage {
    /// Build a `Storage` that keeps progress in a JSON file.
    #[must_use]
    pub fn json_file(path: impl Into<PathBuf>) -> Self {
        Self {
            progress: std::sync::Arc::new(JsonFileRepository::new(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::time::fixed_now;

    fn record(raw: &str, score: u32) -> LessonProgress {
        LessonProgress::new(LessonId::new(raw).unwrap(), score, 2, 300, fixed_now()).unwrap()
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("progress.json"));
        assert!(repo.load_progress().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upserts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.json");

        let repo = JsonFileRepository::new(&path);
        repo.upsert_progress(&record("L002", 70)).await.unwrap();
        repo.upsert_progress(&record("L001", 80)).await.unwrap();
        repo.upsert_progress(&record("L002", 90)).await.unwrap();

        let reopened = JsonFileRepository::new(&path);
        let loaded = reopened.load_progress().await.unwrap();
        assert_eq!(loaded, vec![record("L001", 80), record("L002", 90)]);
        assert_eq!(
            reopened
                .get_progress(&LessonId::new("L002").unwrap())
                .await
                .unwrap()
                .score(),
            90
        );
    }

    #[tokio::test]
    async fn out_of_range_score_on_disk_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(
            &path,
            r#"{"version":1,"progress":[{"lesson_id":"L001","completed":true,"score":140,
                "attempts":1,"time_spent_secs":60,"completed_at":"2023-11-14T22:13:20Z"}]}"#,
        )
        .unwrap();

        let err = JsonFileRepository::new(&path).load_progress().await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn save_rejects_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::json_file(dir.path().join("progress.json"));
        let err = storage
            .progress
            .save_progress(&[record("L001", 10), record("L001", 20)])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn retake_days_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let earlier = (fixed_now() - chrono::Duration::days(1)).date_naive();
        let retaken = record("L001", 95).with_completion_days([earlier]);

        JsonFileRepository::new(&path)
            .upsert_progress(&retaken)
            .await
            .unwrap();

        let loaded = JsonFileRepository::new(&path)
            .get_progress(&LessonId::new("L001").unwrap())
            .await
            .unwrap();
        assert_eq!(loaded, retaken);
        assert_eq!(loaded.completion_days().len(), 2);
    }

    #[tokio::test]
    async fn file_without_days_falls_back_to_completed_at() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(
            &path,
            r#"{"version":1,"progress":[{"lesson_id":"L001","completed":true,"score":80,
                "attempts":1,"time_spent_secs":60,"completed_at":"2023-11-14T22:13:20Z"}]}"#,
        )
        .unwrap();

        let loaded = JsonFileRepository::new(&path).load_progress().await.unwrap();
        let days: Vec<_> = loaded[0].completion_days().iter().copied().collect();
        assert_eq!(days, vec![chrono::NaiveDate::from_ymd_opt(2023, 11, 14).unwrap()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_upserts_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::json_file(dir.path().join("progress.json"));
        let (a, b) = (storage.progress.clone(), storage.progress.clone());

        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.upsert_progress(&record("L001", 80)).await }),
            tokio::spawn(async move { b.upsert_progress(&record("L002", 90)).await }),
        );
        ra.unwrap().unwrap();
        rb.unwrap().unwrap();

        let loaded = storage.progress.load_progress().await.unwrap();
        assert_eq!(loaded, vec![record("L001", 80), record("L002", 90)]);
    }
}
