//! Completion figures for progress bars and the "up next" recommendation.

use crate::catalog::Catalog;
use crate::ledger::CompletedSet;
use crate::model::{Lesson, LessonLevel};
use crate::resolver::is_unlocked;

/// Completed share of a group of lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    /// Whole percent, rounded half-up. 0 when `total == 0`.
    pub percentage: u8,
}

impl Progress {
    fn over<'a>(lessons: impl Iterator<Item = &'a Lesson>, completed: &CompletedSet) -> Self {
        let (total, done) = lessons.fold((0_usize, 0_usize), |(total, done), lesson| {
            let hit = usize::from(completed.contains(lesson.id().as_str()));
            (total + 1, done + hit)
        });
        Self {
            total,
            completed: done,
            percentage: round_percent(done, total),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// `round(100 * part / whole)` with halves rounded up, computed in integers.
pub(crate) fn round_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u128;
    let whole = whole as u128;
    let pct = (200 * part + whole) / (2 * whole);
    u8::try_from(pct).unwrap_or(100)
}

/// Progress across the whole catalog. Ids outside the catalog are ignored.
#[must_use]
pub fn overall(catalog: &Catalog, completed: &CompletedSet) -> Progress {
    Progress::over(catalog.lessons().iter(), completed)
}

#[must_use]
pub fn for_level(catalog: &Catalog, level: LessonLevel, completed: &CompletedSet) -> Progress {
    Progress::over(catalog.by_level(level), completed)
}

#[must_use]
pub fn for_chapter(catalog: &Catalog, chapter: &str, completed: &CompletedSet) -> Progress {
    Progress::over(catalog.by_chapter(chapter), completed)
}

/// Progress for every level, in curriculum order.
#[must_use]
pub fn level_breakdown(catalog: &Catalog, completed: &CompletedSet) -> Vec<(LessonLevel, Progress)> {
    LessonLevel::ALL
        .iter()
        .map(|&level| (level, for_level(catalog, level, completed)))
        .collect()
}

/// First unlocked, not yet completed lesson in catalog order.
///
/// `None` once the curriculum is exhausted.
#[must_use]
pub fn recommended<'a>(catalog: &'a Catalog, completed: &CompletedSet) -> Option<&'a Lesson> {
    catalog
        .lessons()
        .iter()
        .find(|l| !completed.contains(l.id().as_str()) && is_unlocked(l, completed))
}
