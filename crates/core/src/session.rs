use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::{Lesson, LessonId, LessonProgress, ProgressError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Rejected session transitions. The session is left untouched in every case.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("lesson {current} is already in progress")]
    AlreadyInProgress { current: LessonId },

    #[error("no lesson in progress")]
    NotInProgress,

    #[error("invalid completion: {0}")]
    InvalidCompletion(#[from] ProgressError),
}

//
// ─── TYPES ─────────────────────────────────────────────────────────────────────
//

/// Outcome of a step navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMove {
    /// The step changed; carries the new step index.
    Moved(u32),
    /// Already at the first/last step; carries the unchanged index.
    AtBoundary(u32),
}

impl StepMove {
    #[must_use]
    pub fn step(self) -> u32 {
        match self {
            StepMove::Moved(step) | StepMove::AtBoundary(step) => step,
        }
    }
}

/// Result data supplied when the learner finishes a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionInput {
    pub score: u32,
    pub attempts: u32,
    pub time_spent_secs: u64,
}

/// Read-only view of an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub lesson_id: LessonId,
    pub step: u32,
    pub total_steps: u32,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_last_step(&self) -> bool {
        self.step + 1 >= self.total_steps
    }
}

#[derive(Clone, PartialEq, Eq)]
enum State {
    Idle,
    InProgress {
        lesson: Lesson,
        step: u32,
        total_steps: u32,
    },
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Tracks the lesson currently being taken.
///
/// `Idle -> InProgress -> Idle`. Completion is not a state of its own: `complete`
/// hands back a [`LessonProgress`] for the caller to store and returns to `Idle`.
/// Exiting discards the step position; sessions are not resumable.
#[derive(Clone, PartialEq, Eq)]
pub struct LessonSession {
    state: State,
}

impl Default for LessonSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LessonSession {
    #[must_use]
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Begin `lesson` at step 0.
    ///
    /// The step count is the lesson's own, or `default_steps` when it declares none.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyInProgress` if another lesson is active.
    pub fn start(
        &mut self,
        lesson: &Lesson,
        default_steps: u32,
    ) -> Result<SessionSnapshot, SessionError> {
        if let State::InProgress { lesson: current, .. } = &self.state {
            return Err(SessionError::AlreadyInProgress {
                current: current.id().clone(),
            });
        }
        self.state = State::InProgress {
            lesson: lesson.clone(),
            step: 0,
            total_steps: lesson.steps_or(default_steps),
        };
        self.snapshot().ok_or(SessionError::NotInProgress)
    }

    /// Advance one step. The last step never auto-completes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` when idle.
    pub fn next_step(&mut self) -> Result<StepMove, SessionError> {
        let State::InProgress {
            step, total_steps, ..
        } = &mut self.state
        else {
            return Err(SessionError::NotInProgress);
        };
        if *step + 1 < *total_steps {
            *step += 1;
            Ok(StepMove::Moved(*step))
        } else {
            Ok(StepMove::AtBoundary(*step))
        }
    }

    /// Go back one step.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` when idle.
    pub fn previous_step(&mut self) -> Result<StepMove, SessionError> {
        let State::InProgress { step, .. } = &mut self.state else {
            return Err(SessionError::NotInProgress);
        };
        if *step > 0 {
            *step -= 1;
            Ok(StepMove::Moved(*step))
        } else {
            Ok(StepMove::AtBoundary(*step))
        }
    }

    /// Finish the active lesson and return to idle.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` when idle, or
    /// `SessionError::InvalidCompletion` if the result is out of range. The session
    /// stays active on error so the caller can retry.
    pub fn complete(
        &mut self,
        input: CompletionInput,
        completed_at: DateTime<Utc>,
    ) -> Result<LessonProgress, SessionError> {
        let State::InProgress { lesson, .. } = &self.state else {
            return Err(SessionError::NotInProgress);
        };
        let progress = LessonProgress::new(
            lesson.id().clone(),
            input.score,
            input.attempts,
            input.time_spent_secs,
            completed_at,
        )?;
        self.state = State::Idle;
        Ok(progress)
    }

    /// Abandon the active lesson without recording anything.
    ///
    /// Returns the id of the abandoned lesson.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` when idle.
    pub fn exit(&mut self) -> Result<LessonId, SessionError> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::InProgress { lesson, .. } => Ok(lesson.id().clone()),
            State::Idle => Err(SessionError::NotInProgress),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state, State::InProgress { .. })
    }

    #[must_use]
    pub fn current(&self) -> Option<&Lesson> {
        match &self.state {
            State::InProgress { lesson, .. } => Some(lesson),
            State::Idle => None,
        }
    }

    /// Current step index, 0 when idle.
    #[must_use]
    pub fn step(&self) -> u32 {
        match &self.state {
            State::InProgress { step, .. } => *step,
            State::Idle => 0,
        }
    }

    /// Step count of the active lesson, 0 when idle.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        match &self.state {
            State::InProgress { total_steps, .. } => *total_steps,
            State::Idle => 0,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        match &self.state {
            State::InProgress {
                lesson,
                step,
                total_steps,
            } => Some(SessionSnapshot {
                lesson_id: lesson.id().clone(),
                step: *step,
                total_steps: *total_steps,
            }),
            State::Idle => None,
        }
    }
}

impl fmt::Debug for LessonSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            State::Idle => f.write_str("LessonSession(Idle)"),
            State::InProgress {
                lesson,
                step,
                total_steps,
            } => f
                .debug_struct("LessonSession")
                .field("lesson_id", lesson.id())
                .field("step", step)
                .field("total_steps", total_steps)
                .finish(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
