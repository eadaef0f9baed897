use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::LessonId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("score must be between 0 and 100, got {0}")]
    InvalidScore(u32),

    #[error("attempts must be > 0")]
    InvalidAttempts,
}

/// Highest score a lesson can be awarded.
pub const MAX_SCORE: u8 = 100;

//
// ─── LESSON PROGRESS ──────────────────────────────────────────────────────────
//

/// Recorded outcome for a lesson the learner has finished.
///
/// `completion_days` holds every UTC day the lesson was completed on and always
/// contains the day of `completed_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonProgress {
    lesson_id: LessonId,
    completed: bool,
    score: u8,
    attempts: u32,
    time_spent_secs: u64,
    completed_at: DateTime<Utc>,
    completion_days: BTreeSet<NaiveDate>,
}

impl LessonProgress {
    /// Creates a completed progress record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidScore` if `score > 100`, or
    /// `ProgressError::InvalidAttempts` if `attempts == 0`.
    pub fn new(
        lesson_id: LessonId,
        score: u32,
        attempts: u32,
        time_spent_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        Self::from_persisted(lesson_id, true, score, attempts, time_spent_secs, completed_at)
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Same validation as [`LessonProgress::new`].
    pub fn from_persisted(
        lesson_id: LessonId,
        completed: bool,
        score: u32,
        attempts: u32,
        time_spent_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        let score = u8::try_from(score)
            .ok()
            .filter(|s| *s <= MAX_SCORE)
            .ok_or(ProgressError::InvalidScore(score))?;
        if attempts == 0 {
            return Err(ProgressError::InvalidAttempts);
        }

        Ok(Self {
            lesson_id,
            completed,
            score,
            attempts,
            time_spent_secs,
            completed_at,
            completion_days: BTreeSet::from([completed_at.date_naive()]),
        })
    }

    /// Add earlier completion days restored from storage.
    #[must_use]
    pub fn with_completion_days(mut self, days: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.completion_days.extend(days);
        self
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Every UTC day this lesson was completed on, oldest first.
    #[must_use]
    pub fn completion_days(&self) -> &BTreeSet<NaiveDate> {
        &self.completion_days
    }

    /// Fold a later completion of the same lesson into this record.
    ///
    /// Keeps the best score, sums attempts and time, takes the latest timestamp
    /// and unions the completion days.
    pub(crate) fn merge(&mut self, later: &LessonProgress) {
        self.completed = self.completed || later.completed;
        self.score = self.score.max(later.score);
        self.attempts = self.attempts.saturating_add(later.attempts);
        self.time_spent_secs = self.time_spent_secs.saturating_add(later.time_spent_secs);
        self.completed_at = self.completed_at.max(later.completed_at);
        self.completion_days
            .extend(later.completion_days.iter().copied());
    }

    /// Apply a partial update. Fields left as `None` are untouched.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if a supplied value is out of range; the record is
    /// unchanged in that case.
    pub fn apply_patch(&mut self, patch: &ProgressPatch) -> Result<(), ProgressError> {
        let score = match patch.score {
            Some(score) => Some(
                u8::try_from(score)
                    .ok()
                    .filter(|s| *s <= MAX_SCORE)
                    .ok_or(ProgressError::InvalidScore(score))?,
            ),
            None => None,
        };
        if patch.attempts == Some(0) {
            return Err(ProgressError::InvalidAttempts);
        }

        if let Some(score) = score {
            self.score = score;
        }
        if let Some(attempts) = patch.attempts {
            self.attempts = attempts;
        }
        if let Some(secs) = patch.time_spent_secs {
            self.time_spent_secs = secs;
        }
        if let Some(at) = patch.completed_at {
            self.completed_at = at;
            self.completion_days.insert(at.date_naive());
        }
        Ok(())
    }
}

/// Partial update for an existing progress record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressPatch {
    pub score: Option<u32>,
    pub attempts: Option<u32>,
    pub time_spent_secs: Option<u64>,
    pub completed_at: Option<DateTime<Utc>>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
