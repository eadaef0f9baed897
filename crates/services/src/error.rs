//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tutor_core::model::{LessonId, ProgressError};
use tutor_core::session::SessionError;

/// Errors emitted by `TutorService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TutorError {
    #[error("lesson not found: {0}")]
    NotFound(String),

    #[error("lesson {id} is locked; missing prerequisites: {}", join_ids(.missing))]
    Locked { id: LessonId, missing: Vec<LessonId> },

    #[error("no progress recorded for lesson {0}")]
    NoProgress(LessonId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("storage init failed: {0}")]
    Init(#[from] SqliteInitError),
}

fn join_ids(ids: &[LessonId]) -> String {
    ids.iter()
        .map(LessonId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
