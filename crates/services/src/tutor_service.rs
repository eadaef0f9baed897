use std::fmt;
use std::sync::Arc;

use storage::repository::{ProgressRepository, Storage};
use tutor_core::model::{Lesson, LessonId, LessonLevel, LessonProgress, ProgressPatch};
use tutor_core::session::{CompletionInput, LessonSession, SessionError, SessionSnapshot, StepMove};
use tutor_core::{
    Catalog, CompletedSet, DEFAULT_LESSON_STEPS, LearnerStats, Progress, ProgressBook, progress,
    resolver,
};

use crate::Clock;
use crate::error::TutorError;

/// Whether a lesson can be taken right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonStatus {
    Completed,
    Unlocked,
    Locked { missing: Vec<LessonId> },
}

/// Owns the learner's curriculum state.
///
/// Holds the shared catalog, the authoritative progress book and the single
/// active lesson session. Commands mutate through `&mut self`; queries are
/// read-only and reflect every completed command.
pub struct TutorService {
    clock: Clock,
    catalog: Arc<Catalog>,
    progress: Arc<dyn ProgressRepository>,
    book: ProgressBook,
    session: LessonSession,
    default_steps: u32,
}

impl TutorService {
    /// Hydrate the service from the progress repository.
    ///
    /// Records for lessons that are not in the catalog are kept (they count for
    /// nothing in the aggregates) so switching curricula does not lose history.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Storage` if progress cannot be loaded.
    pub async fn load(
        clock: Clock,
        catalog: Arc<Catalog>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Result<Self, TutorError> {
        let records = progress.load_progress().await?;
        let unknown = records
            .iter()
            .filter(|r| !catalog.contains(r.lesson_id().as_str()))
            .count();
        if unknown > 0 {
            tracing::warn!(unknown, "progress references lessons outside the catalog");
        }
        let book = ProgressBook::from_records(records);
        tracing::info!(
            lessons = catalog.len(),
            completed = book.len(),
            "tutor state loaded"
        );

        Ok(Self {
            clock,
            catalog,
            progress,
            book,
            session: LessonSession::new(),
            default_steps: DEFAULT_LESSON_STEPS,
        })
    }

    /// Build the service over `SQLite`, running migrations first.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Init` if the database cannot be opened or migrated, or
    /// `TutorError::Storage` if progress cannot be loaded.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        catalog: Arc<Catalog>,
    ) -> Result<Self, TutorError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::with_storage(storage, clock, catalog).await
    }

    /// Build the service over an already opened storage backend.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Storage` if progress cannot be loaded.
    pub async fn with_storage(
        storage: Storage,
        clock: Clock,
        catalog: Arc<Catalog>,
    ) -> Result<Self, TutorError> {
        Self::load(clock, catalog, storage.progress).await
    }

    /// Build the service over a fresh in-memory repository.
    ///
    /// # Errors
    ///
    /// Infallible in practice; shares the signature of `load`.
    pub async fn in_memory(clock: Clock, catalog: Arc<Catalog>) -> Result<Self, TutorError> {
        Self::with_storage(Storage::in_memory(), clock, catalog).await
    }

    /// Step count for lessons that do not declare their own. Zero is treated as one.
    #[must_use]
    pub fn with_default_steps(mut self, steps: u32) -> Self {
        self.default_steps = steps.max(1);
        self
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn book(&self) -> &ProgressBook {
        &self.book
    }

    #[must_use]
    pub fn session(&self) -> Option<SessionSnapshot> {
        self.session.snapshot()
    }

    #[must_use]
    pub fn current_lesson(&self) -> Option<&Lesson> {
        self.session.current()
    }

    #[must_use]
    pub fn completed_set(&self) -> CompletedSet {
        self.book.completed_set()
    }

    #[must_use]
    pub fn available(&self) -> Vec<&Lesson> {
        resolver::available_lessons(&self.catalog, &self.completed_set())
    }

    /// Status of one lesson, `None` if the id is not in the catalog.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<LessonStatus> {
        let lesson = self.catalog.get(id)?;
        let completed = self.completed_set();
        if completed.contains(id) {
            return Some(LessonStatus::Completed);
        }
        let missing = resolver::missing_prerequisites(lesson, &completed);
        if missing.is_empty() {
            Some(LessonStatus::Unlocked)
        } else {
            Some(LessonStatus::Locked {
                missing: missing.into_iter().cloned().collect(),
            })
        }
    }

    #[must_use]
    pub fn overall_progress(&self) -> Progress {
        progress::overall(&self.catalog, &self.completed_set())
    }

    #[must_use]
    pub fn level_progress(&self, level: LessonLevel) -> Progress {
        progress::for_level(&self.catalog, level, &self.completed_set())
    }

    #[must_use]
    pub fn chapter_progress(&self, chapter: &str) -> Progress {
        progress::for_chapter(&self.catalog, chapter, &self.completed_set())
    }

    #[must_use]
    pub fn level_breakdown(&self) -> Vec<(LessonLevel, Progress)> {
        progress::level_breakdown(&self.catalog, &self.completed_set())
    }

    #[must_use]
    pub fn recommended(&self) -> Option<&Lesson> {
        progress::recommended(&self.catalog, &self.completed_set())
    }

    #[must_use]
    pub fn stats(&self) -> LearnerStats {
        LearnerStats::from_book(&self.book, self.clock.today())
    }

    //
    // ─── COMMANDS ──────────────────────────────────────────────────────────────
    //

    /// Start taking a lesson.
    ///
    /// Completed lessons may be retaken; the new result is merged into the
    /// existing record on completion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyInProgress` (wrapped) while another lesson is
    /// active, `TutorError::NotFound` for unknown ids and `TutorError::Locked` when
    /// prerequisites are outstanding. State is unchanged on error.
    pub fn start_lesson(&mut self, id: &str) -> Result<SessionSnapshot, TutorError> {
        if let Some(current) = self.session.current() {
            tracing::warn!(requested = id, current = %current.id(), "start rejected: lesson in progress");
            return Err(SessionError::AlreadyInProgress {
                current: current.id().clone(),
            }
            .into());
        }

        let lesson = self
            .catalog
            .get(id)
            .ok_or_else(|| TutorError::NotFound(id.to_owned()))?;

        let missing = resolver::missing_prerequisites(lesson, &self.completed_set());
        if !missing.is_empty() {
            return Err(TutorError::Locked {
                id: lesson.id().clone(),
                missing: missing.into_iter().cloned().collect(),
            });
        }

        let snapshot = self.session.start(lesson, self.default_steps)?;
        tracing::info!(
            lesson = %snapshot.lesson_id,
            total_steps = snapshot.total_steps,
            "lesson started"
        );
        Ok(snapshot)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` (wrapped) when no lesson is active.
    pub fn next_step(&mut self) -> Result<StepMove, TutorError> {
        let moved = self.session.next_step().inspect_err(log_rejected)?;
        tracing::debug!(?moved, "next step");
        Ok(moved)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` (wrapped) when no lesson is active.
    pub fn previous_step(&mut self) -> Result<StepMove, TutorError> {
        let moved = self.session.previous_step().inspect_err(log_rejected)?;
        tracing::debug!(?moved, "previous step");
        Ok(moved)
    }

    /// Finish the active lesson, record the result and persist it.
    ///
    /// Returns the authoritative (possibly merged) record for the lesson. Nothing
    /// changes in memory unless persistence succeeds.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Session` when idle or the result is out of range, and
    /// `TutorError::Storage` if the record cannot be saved.
    pub async fn complete_lesson(
        &mut self,
        input: CompletionInput,
    ) -> Result<LessonProgress, TutorError> {
        let mut session = self.session.clone();
        let result = session
            .complete(input, self.clock.now())
            .inspect_err(log_rejected)?;

        let mut book = self.book.clone();
        let merged = book.record(result).clone();
        self.progress.upsert_progress(&merged).await?;

        self.session = session;
        self.book = book;
        tracing::info!(
            lesson = %merged.lesson_id(),
            score = merged.score(),
            attempts = merged.attempts(),
            "lesson completed"
        );
        Ok(merged)
    }

    /// Leave the active lesson without recording progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` (wrapped) when no lesson is active.
    pub fn exit_lesson(&mut self) -> Result<LessonId, TutorError> {
        let id = self.session.exit().inspect_err(log_rejected)?;
        tracing::info!(lesson = %id, "lesson exited");
        Ok(id)
    }

    /// Patch the stored record of the active lesson.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` (wrapped) when no lesson is active,
    /// `TutorError::NoProgress` if the lesson has never been completed,
    /// `TutorError::Progress` for out-of-range values and `TutorError::Storage`
    /// if the update cannot be saved.
    pub async fn update_progress(
        &mut self,
        patch: ProgressPatch,
    ) -> Result<LessonProgress, TutorError> {
        let id = self
            .session
            .current()
            .map(|l| l.id().clone())
            .ok_or(SessionError::NotInProgress)?;

        let mut book = self.book.clone();
        let updated = book
            .patch(id.as_str(), &patch)?
            .cloned()
            .ok_or_else(|| TutorError::NoProgress(id.clone()))?;
        self.progress.upsert_progress(&updated).await?;

        self.book = book;
        tracing::debug!(lesson = %id, "progress updated");
        Ok(updated)
    }
}

fn log_rejected(err: &SessionError) {
    tracing::warn!(%err, "session transition rejected");
}

impl fmt::Debug for TutorService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TutorService")
            .field("lessons", &self.catalog.len())
            .field("completed", &self.book.len())
            .field("session", &self.session)
            .field("default_steps", &self.default_steps)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
