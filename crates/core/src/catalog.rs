//! The immutable lesson catalog.
//!
//! A `Catalog` is built once from validated lessons. Construction rejects duplicate
//! ids, prerequisites that point outside the catalog, and prerequisite cycles, so
//! every lesson in a live catalog is reachable by completing its ancestors.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::model::{Lesson, LessonDraft, LessonError, LessonId, LessonLevel};

/// Curriculum compiled into the binary.
const BUILTIN_CURRICULUM: &str = include_str!("../data/curriculum.json");

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("duplicate lesson id: {0}")]
    DuplicateId(LessonId),

    #[error("lesson {lesson} requires unknown lesson {missing}")]
    UnknownPrerequisite { lesson: LessonId, missing: LessonId },

    #[error("prerequisite cycle: {}", format_cycle(.0))]
    Cycle(Vec<LessonId>),

    #[error("invalid lesson at position {index}: {source}")]
    InvalidLesson {
        index: usize,
        #[source]
        source: LessonError,
    },

    #[error("malformed curriculum data: {0}")]
    Malformed(String),
}

fn format_cycle(ids: &[LessonId]) -> String {
    ids.iter()
        .map(LessonId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

//
// ─── FILTER / STATS ────────────────────────────────────────────────────────────
//

/// Text and level filter used by lesson lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonFilter {
    /// Case-insensitive substring matched against title or description.
    pub query: Option<String>,
    pub level: Option<LessonLevel>,
}

impl LessonFilter {
    #[must_use]
    pub fn matches(&self, lesson: &Lesson) -> bool {
        if let Some(level) = self.level {
            if lesson.level() != level {
                return false;
            }
        }
        match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => {
                let needle = query.to_lowercase();
                lesson.title().to_lowercase().contains(&needle)
                    || lesson.description().to_lowercase().contains(&needle)
            }
        }
    }
}

/// Summary figures over the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub total: usize,
    pub by_level: [(LessonLevel, usize); 4],
    pub total_duration_min: u64,
    /// Rounded half-up; 0 for an empty catalog.
    pub average_duration_min: u64,
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    lessons: Vec<Lesson>,
    index: HashMap<LessonId, usize>,
}

impl Catalog {
    /// Build a catalog from lessons in curriculum order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId`, `CatalogError::UnknownPrerequisite`
    /// or `CatalogError::Cycle` when the lessons do not form a valid curriculum.
    pub fn new(lessons: Vec<Lesson>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(lessons.len());
        for (pos, lesson) in lessons.iter().enumerate() {
            if index.insert(lesson.id().clone(), pos).is_some() {
                return Err(CatalogError::DuplicateId(lesson.id().clone()));
            }
        }

        for lesson in &lessons {
            if let Some(missing) = lesson
                .prerequisites()
                .iter()
                .find(|p| !index.contains_key(*p))
            {
                return Err(CatalogError::UnknownPrerequisite {
                    lesson: lesson.id().clone(),
                    missing: missing.clone(),
                });
            }
        }

        let catalog = Self { lessons, index };
        if let Some(cycle) = catalog.find_cycle() {
            return Err(CatalogError::Cycle(cycle));
        }
        Ok(catalog)
    }

    /// Validate drafts and build a catalog from them.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidLesson` for the first draft that fails validation,
    /// otherwise any error from [`Catalog::new`].
    pub fn from_drafts(drafts: Vec<LessonDraft>) -> Result<Self, CatalogError> {
        let lessons = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                draft
                    .validate()
                    .map_err(|source| CatalogError::InvalidLesson { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(lessons)
    }

    /// Parse a JSON array of lesson drafts.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Malformed` if the JSON does not match the lesson shape.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let drafts: Vec<LessonDraft> =
            serde_json::from_str(json).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        Self::from_drafts(drafts)
    }

    /// The curriculum shipped with the crate.
    ///
    /// # Errors
    ///
    /// Only fails if the bundled data is corrupt.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CURRICULUM)
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Lesson> {
        self.index.get(id).map(|&pos| &self.lessons[pos])
    }

    pub fn by_level(&self, level: LessonLevel) -> impl Iterator<Item = &Lesson> + '_ {
        self.lessons.iter().filter(move |l| l.level() == level)
    }

    pub fn by_chapter<'a>(&'a self, chapter: &'a str) -> impl Iterator<Item = &'a Lesson> + 'a {
        self.lessons.iter().filter(move |l| l.chapter() == chapter)
    }

    /// Lesson following `id` in catalog order.
    #[must_use]
    pub fn next(&self, id: &str) -> Option<&Lesson> {
        let pos = *self.index.get(id)?;
        self.lessons.get(pos + 1)
    }

    /// Lesson preceding `id` in catalog order.
    #[must_use]
    pub fn previous(&self, id: &str) -> Option<&Lesson> {
        let pos = *self.index.get(id)?;
        pos.checked_sub(1).and_then(|p| self.lessons.get(p))
    }

    /// Distinct chapters in order of first appearance.
    #[must_use]
    pub fn chapters(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.lessons
            .iter()
            .map(Lesson::chapter)
            .filter(|c| seen.insert(*c))
            .collect()
    }

    pub fn search<'a>(&'a self, filter: &'a LessonFilter) -> impl Iterator<Item = &'a Lesson> + 'a {
        self.lessons.iter().filter(move |l| filter.matches(l))
    }

    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        let by_level = LessonLevel::ALL.map(|level| (level, self.by_level(level).count()));
        let total_duration_min: u64 = self
            .lessons
            .iter()
            .map(|l| u64::from(l.duration_min()))
            .sum();
        let total = self.lessons.len();
        let count = u64::try_from(total).unwrap_or(u64::MAX);
        let average_duration_min = if count == 0 {
            0
        } else {
            (2 * total_duration_min + count) / (2 * count)
        };

        CatalogStats {
            total,
            by_level,
            total_duration_min,
            average_duration_min,
        }
    }

    // Iterative three-colour DFS over prerequisite edges. Returns the first cycle
    // found as a closed path (first id repeated at the end).
    fn find_cycle(&self) -> Option<Vec<LessonId>> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Unvisited,
            OnStack,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.lessons.len()];
        for root in 0..self.lessons.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            // (lesson position, next prerequisite to visit)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            marks[root] = Mark::OnStack;

            while let Some(frame) = stack.last_mut() {
                let (pos, edge) = *frame;
                let prereqs = self.lessons[pos].prerequisites();
                if edge == prereqs.len() {
                    marks[pos] = Mark::Done;
                    stack.pop();
                    continue;
                }
                frame.1 += 1;

                let Some(&next) = self.index.get(&prereqs[edge]) else {
                    continue;
                };
                match marks[next] {
                    Mark::Done => {}
                    Mark::Unvisited => {
                        marks[next] = Mark::OnStack;
                        stack.push((next, 0));
                    }
                    Mark::OnStack => {
                        let start = stack.iter().position(|(p, _)| *p == next).unwrap_or(0);
                        let mut cycle: Vec<LessonId> = stack[start..]
                            .iter()
                            .map(|(p, _)| self.lessons[*p].id().clone())
                            .collect();
                        cycle.push(self.lessons[next].id().clone());
                        return Some(cycle);
                    }
                }
            }
        }
        None
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn id(raw: &str) -> LessonId {
        LessonId::new(raw).unwrap()
    }

    pub(crate) fn lesson(raw_id: &str, level: LessonLevel, chapter: &str, prereqs: &[&str]) -> Lesson {
        LessonDraft {
            id: id(raw_id),
            title: format!("Lesson {raw_id}"),
            description: format!("{chapter} practice"),
            level,
            chapter: chapter.into(),
            duration_min: 10,
            prerequisites: prereqs.iter().map(|p| id(p)).collect(),
            steps: None,
        }
        .validate()
        .unwrap()
    }

    /// A, B(A), C(B) beginner alphabet; D(C) intermediate contractions.
    pub(crate) fn small_catalog() -> Catalog {
        Catalog::new(vec![
            lesson("A", LessonLevel::Beginner, "Alphabet", &[]),
            lesson("B", LessonLevel::Beginner, "Alphabet", &["A"]),
            lesson("C", LessonLevel::Beginner, "Numbers", &["B"]),
            lesson("D", LessonLevel::Intermediate, "Contractions", &["C"]),
        ])
        .unwrap()
    }

    #[test]
    fn lookup_by_id() {
        let catalog = small_catalog();
        assert_eq!(catalog.get("B").unwrap().id(), &id("B"));
        assert!(catalog.get("Z").is_none());
    }

    #[test]
    fn filters_preserve_catalog_order_and_restart() {
        let catalog = small_catalog();
        let beginners: Vec<_> = catalog
            .by_level(LessonLevel::Beginner)
            .map(|l| l.id().as_str())
            .collect();
        assert_eq!(beginners, ["A", "B", "C"]);
        let again: Vec<_> = catalog
            .by_level(LessonLevel::Beginner)
            .map(|l| l.id().as_str())
            .collect();
        assert_eq!(beginners, again);

        let alphabet: Vec<_> = catalog.by_chapter("Alphabet").map(|l| l.id().as_str()).collect();
        assert_eq!(alphabet, ["A", "B"]);
        assert_eq!(catalog.by_chapter("Music").count(), 0);
        assert_eq!(catalog.by_level(LessonLevel::Expert).count(), 0);
    }

    #[test]
    fn next_and_previous_stop_at_boundaries() {
        let catalog = small_catalog();
        assert_eq!(catalog.next("A").unwrap().id(), &id("B"));
        assert!(catalog.next("D").is_none());
        assert_eq!(catalog.previous("B").unwrap().id(), &id("A"));
        assert!(catalog.previous("A").is_none());
        assert!(catalog.next("missing").is_none());
    }

    #[test]
    fn next_lesson_round_trips_through_lookup() {
        let catalog = small_catalog();
        for lesson in &catalog.lessons()[..catalog.len() - 1] {
            let next = catalog.next(lesson.id().as_str()).unwrap();
            assert_eq!(catalog.get(next.id().as_str()), Some(next));
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Catalog::new(vec![
            lesson("A", LessonLevel::Beginner, "Alphabet", &[]),
            lesson("A", LessonLevel::Beginner, "Alphabet", &[]),
        ])
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateId(id("A")));
    }

    #[test]
    fn rejects_unknown_prerequisite() {
        let err = Catalog::new(vec![lesson("B", LessonLevel::Beginner, "Alphabet", &["A"])])
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownPrerequisite {
                lesson: id("B"),
                missing: id("A"),
            }
        );
    }

    #[test]
    fn rejects_cycles() {
        let err = Catalog::new(vec![
            lesson("A", LessonLevel::Beginner, "Alphabet", &["C"]),
            lesson("B", LessonLevel::Beginner, "Alphabet", &["A"]),
            lesson("C", LessonLevel::Beginner, "Alphabet", &["B"]),
        ])
        .unwrap_err();
        let path = match err {
            CatalogError::Cycle(path) => path,
            other => panic!("expected cycle, got {other:?}"),
        };
        assert_eq!(path.first(), path.last());
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn accepts_diamond_dependencies() {
        let catalog = Catalog::new(vec![
            lesson("A", LessonLevel::Beginner, "Alphabet", &[]),
            lesson("B", LessonLevel::Beginner, "Alphabet", &["A"]),
            lesson("C", LessonLevel::Beginner, "Alphabet", &["A"]),
            lesson("D", LessonLevel::Beginner, "Alphabet", &["B", "C"]),
        ]);
        assert!(catalog.is_ok());
    }

    #[test]
    fn search_matches_title_or_description_and_level() {
        let catalog = small_catalog();
        let filter = LessonFilter {
            query: Some("NUMBERS".into()),
            level: None,
        };
        let hits: Vec<_> = catalog.search(&filter).map(|l| l.id().as_str()).collect();
        assert_eq!(hits, ["C"]);

        let filter = LessonFilter {
            query: Some("lesson".into()),
            level: Some(LessonLevel::Intermediate),
        };
        let hits: Vec<_> = catalog.search(&filter).map(|l| l.id().as_str()).collect();
        assert_eq!(hits, ["D"]);

        assert_eq!(catalog.search(&LessonFilter::default()).count(), 4);
    }

    #[test]
    fn stats_summarise_levels_and_duration() {
        let stats = small_catalog().stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_level[0], (LessonLevel::Beginner, 3));
        assert_eq!(stats.by_level[1], (LessonLevel::Intermediate, 1));
        assert_eq!(stats.by_level[3], (LessonLevel::Expert, 0));
        assert_eq!(stats.total_duration_min, 40);
        assert_eq!(stats.average_duration_min, 10);

        let empty = Catalog::new(Vec::new()).unwrap().stats();
        assert_eq!(empty.average_duration_min, 0);
    }

    #[test]
    fn chapters_in_first_appearance_order() {
        assert_eq!(
            small_catalog().chapters(),
            ["Alphabet", "Numbers", "Contractions"]
        );
    }

    #[test]
    fn from_json_reports_bad_drafts() {
        let err = Catalog::from_json("{\"not\": \"an array\"}").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(_)));

        let json = r#"[{"id":"L001","title":" ","level":"Beginner","chapter":"Alphabet","duration_min":5}]"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert_eq!(
            err,
            CatalogError::InvalidLesson {
                index: 0,
                source: LessonError::EmptyTitle,
            }
        );
    }

    #[test]
    fn builtin_curriculum_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert!(!catalog.is_empty());
        for level in LessonLevel::ALL {
            assert!(catalog.by_level(level).count() > 0, "no {level} lessons");
        }
        let ids: Vec<_> = catalog.lessons().iter().map(Lesson::id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted, "builtin ids should follow curriculum order");
    }
}
