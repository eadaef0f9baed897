use std::collections::{BTreeMap, HashSet};

use crate::model::{LessonId, LessonProgress, ProgressError, ProgressPatch};

//
// ─── COMPLETED SET ─────────────────────────────────────────────────────────────
//

/// Ids of lessons the learner has finished.
///
/// Membership is all that matters: order of insertion and duplicates are irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedSet(HashSet<LessonId>);

impl CompletedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Any record for a lesson counts as completing it.
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a LessonProgress>) -> Self {
        records.into_iter().map(|r| r.lesson_id().clone()).collect()
    }

    /// Returns true if the id was not already present.
    pub fn insert(&mut self, id: LessonId) -> bool {
        self.0.insert(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LessonId> {
        self.0.iter()
    }
}

impl FromIterator<LessonId> for CompletedSet {
    fn from_iter<T: IntoIterator<Item = LessonId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<LessonId> for CompletedSet {
    fn extend<T: IntoIterator<Item = LessonId>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

//
// ─── PROGRESS BOOK ─────────────────────────────────────────────────────────────
//

/// Authoritative progress records, one per lesson.
///
/// Recording a lesson that already has a record merges the two (see
/// [`ProgressBook::record`]), so the book never holds duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressBook {
    records: BTreeMap<LessonId, LessonProgress>,
}

impl ProgressBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from persisted records, merging any duplicates.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = LessonProgress>) -> Self {
        let mut book = Self::new();
        for record in records {
            book.record(record);
        }
        book
    }

    /// Store a completion and return the resulting authoritative record.
    ///
    /// Re-completing a lesson keeps the best score, sums attempts and time spent,
    /// moves `completed_at` to the latest completion and keeps every completion day.
    pub fn record(&mut self, progress: LessonProgress) -> &LessonProgress {
        match self.records.entry(progress.lesson_id().clone()) {
            std::collections::btree_map::Entry::Occupied(entry) => {
                let existing = entry.into_mut();
                existing.merge(&progress);
                existing
            }
            std::collections::btree_map::Entry::Vacant(entry) => entry.insert(progress),
        }
    }

    /// Patch the record for `id`.
    ///
    /// Returns `Ok(None)` when the lesson has no record yet.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the patch carries out-of-range values.
    pub fn patch(
        &mut self,
        id: &str,
        patch: &ProgressPatch,
    ) -> Result<Option<&LessonProgress>, ProgressError> {
        let Some(record) = self.records.get_mut(id) else {
            return Ok(None);
        };
        record.apply_patch(patch)?;
        Ok(Some(&*record))
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&LessonProgress> {
        self.records.get(id)
    }

    /// Records ordered by lesson id.
    pub fn records(&self) -> impl Iterator<Item = &LessonProgress> {
        self.records.values()
    }

    #[must_use]
    pub fn completed_set(&self) -> CompletedSet {
        CompletedSet::from_records(self.records.values())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn id(raw: &str) -> LessonId {
        LessonId::new(raw).unwrap()
    }

    #[test]
    fn completed_set_ignores_duplicates() {
        let set: CompletedSet = [id("A"), id("B"), id("A")].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains("A"));
        assert!(!set.contains("C"));
    }

    #[test]
    fn duplicate_records_still_count_once() {
        let records = vec![
            LessonProgress::new(id("A"), 80, 1, 60, fixed_now()).unwrap(),
            LessonProgress::new(id("A"), 60, 1, 60, fixed_now()).unwrap(),
        ];
        let set = CompletedSet::from_records(&records);
        assert_eq!(set.len(), 1);
        assert!(set.contains("A"));
    }

    #[test]
    fn recording_twice_merges() {
        let mut book = ProgressBook::new();
        book.record(LessonProgress::new(id("A"), 60, 1, 100, fixed_now()).unwrap());
        let later = fixed_now() + Duration::hours(3);
        let merged = book
            .record(LessonProgress::new(id("A"), 95, 1, 50, later).unwrap())
            .clone();

        assert_eq!(book.len(), 1);
        assert_eq!(merged.score(), 95);
        assert_eq!(merged.attempts(), 2);
        assert_eq!(merged.time_spent_secs(), 150);
        assert_eq!(merged.completed_at(), later);
    }

    #[test]
    fn from_records_collapses_duplicates() {
        let book = ProgressBook::from_records(vec![
            LessonProgress::new(id("B"), 70, 1, 10, fixed_now()).unwrap(),
            LessonProgress::new(id("A"), 70, 1, 10, fixed_now()).unwrap(),
            LessonProgress::new(id("B"), 90, 2, 10, fixed_now()).unwrap(),
        ]);
        assert_eq!(book.len(), 2);
        let ids: Vec<_> = book.records().map(|r| r.lesson_id().as_str()).collect();
        assert_eq!(ids, ["A", "B"]);
        assert_eq!(book.get("B").unwrap().attempts(), 3);
    }

    #[test]
    fn patch_missing_record_is_none() {
        let mut book = ProgressBook::new();
        let patch = ProgressPatch {
            score: Some(50),
            ..ProgressPatch::default()
        };
        assert!(book.patch("A", &patch).unwrap().is_none());

        book.record(LessonProgress::new(id("A"), 10, 1, 10, fixed_now()).unwrap());
        let updated = book.patch("A", &patch).unwrap().unwrap();
        assert_eq!(updated.score(), 50);
    }
}
