#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod model;
pub mod progress;
pub mod resolver;
pub mod session;
pub mod stats;
pub mod time;

pub use catalog::{Catalog, CatalogError, CatalogStats, LessonFilter};
pub use error::Error;
pub use ledger::{CompletedSet, ProgressBook};
pub use progress::Progress;
pub use session::{CompletionInput, LessonSession, SessionError, SessionSnapshot, StepMove};
pub use stats::LearnerStats;
pub use time::Clock;

/// Step count used when a lesson does not declare its own.
pub const DEFAULT_LESSON_STEPS: u32 = 5;
