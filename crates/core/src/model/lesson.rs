use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::LessonId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("lesson chapter cannot be empty")]
    EmptyChapter,

    #[error("lesson duration must be > 0 minutes")]
    InvalidDuration,

    #[error("lesson step count must be > 0")]
    InvalidSteps,

    #[error("lesson {0} lists itself as a prerequisite")]
    SelfPrerequisite(LessonId),

    #[error("unknown lesson level: {0}")]
    UnknownLevel(String),
}

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

/// Curriculum tier of a lesson.
///
/// Ordering follows the curriculum: `Beginner < Intermediate < Advanced < Expert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum LessonLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl LessonLevel {
    /// All levels in curriculum order.
    pub const ALL: [LessonLevel; 4] = [
        LessonLevel::Beginner,
        LessonLevel::Intermediate,
        LessonLevel::Advanced,
        LessonLevel::Expert,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonLevel::Beginner => "Beginner",
            LessonLevel::Intermediate => "Intermediate",
            LessonLevel::Advanced => "Advanced",
            LessonLevel::Expert => "Expert",
        }
    }
}

impl fmt::Display for LessonLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LessonLevel {
    type Err = LessonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "expert" => Ok(Self::Expert),
            _ => Err(LessonError::UnknownLevel(s.to_owned())),
        }
    }
}

impl TryFrom<String> for LessonLevel {
    type Error = LessonError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated lesson data, as found in curriculum files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDraft {
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub level: LessonLevel,
    pub chapter: String,
    pub duration_min: u32,
    #[serde(default)]
    pub prerequisites: Vec<LessonId>,
    #[serde(default)]
    pub steps: Option<u32>,
}

impl LessonDraft {
    /// Validate and normalize the draft into a `Lesson`.
    ///
    /// Title, description and chapter are trimmed; duplicate prerequisites are dropped
    /// while keeping their first-declared order.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if a required field is blank, a count is zero, or the
    /// lesson requires itself.
    pub fn validate(self) -> Result<Lesson, LessonError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        let chapter = self.chapter.trim().to_owned();
        if chapter.is_empty() {
            return Err(LessonError::EmptyChapter);
        }
        if self.duration_min == 0 {
            return Err(LessonError::InvalidDuration);
        }
        if self.steps == Some(0) {
            return Err(LessonError::InvalidSteps);
        }

        let mut prerequisites: Vec<LessonId> = Vec::with_capacity(self.prerequisites.len());
        for prereq in self.prerequisites {
            if prereq == self.id {
                return Err(LessonError::SelfPrerequisite(self.id));
            }
            if !prerequisites.contains(&prereq) {
                prerequisites.push(prereq);
            }
        }

        Ok(Lesson {
            id: self.id,
            title,
            description: self.description.trim().to_owned(),
            level: self.level,
            chapter,
            duration_min: self.duration_min,
            prerequisites,
            steps: self.steps,
        })
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// Immutable catalog record for a single lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    description: String,
    level: LessonLevel,
    chapter: String,
    duration_min: u32,
    prerequisites: Vec<LessonId>,
    steps: Option<u32>,
}

impl Lesson {
    // Accessors
    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn level(&self) -> LessonLevel {
        self.level
    }

    #[must_use]
    pub fn chapter(&self) -> &str {
        &self.chapter
    }

    #[must_use]
    pub fn duration_min(&self) -> u32 {
        self.duration_min
    }

    #[must_use]
    pub fn prerequisites(&self) -> &[LessonId] {
        &self.prerequisites
    }

    /// Step count declared by the lesson content, if any.
    #[must_use]
    pub fn steps(&self) -> Option<u32> {
        self.steps
    }

    /// Step count to use when taking this lesson.
    #[must_use]
    pub fn steps_or(&self, default_steps: u32) -> u32 {
        self.steps.unwrap_or(default_steps).max(1)
    }

    /// Convert back into a draft, e.g. for writing a curriculum file.
    #[must_use]
    pub fn to_draft(&self) -> LessonDraft {
        LessonDraft {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            level: self.level,
            chapter: self.chapter.clone(),
            duration_min: self.duration_min,
            prerequisites: self.prerequisites.clone(),
            steps: self.steps,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
