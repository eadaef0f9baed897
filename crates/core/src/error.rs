use thiserror::Error;

use crate::catalog::CatalogError;
use crate::model::{LessonError, ProgressError};
use crate::session::SessionError;

/// Umbrella error for callers that want a single type across the core crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
