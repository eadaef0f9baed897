mod ids;
mod lesson;
mod record;

pub use ids::{LessonId, ParseIdError};
pub use lesson::{Lesson, LessonDraft, LessonError, LessonLevel};
pub use record::{LessonProgress, MAX_SCORE, ProgressError, ProgressPatch};
