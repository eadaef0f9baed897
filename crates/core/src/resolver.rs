//! Prerequisite gating.
//!
//! A lesson is unlocked once every prerequisite is in the completed set. Catalog
//! construction guarantees prerequisites exist, so nothing here has to handle
//! dangling ids.

use crate::catalog::Catalog;
use crate::ledger::CompletedSet;
use crate::model::{Lesson, LessonId};

#[must_use]
pub fn is_unlocked(lesson: &Lesson, completed: &CompletedSet) -> bool {
    lesson
        .prerequisites()
        .iter()
        .all(|p| completed.contains(p.as_str()))
}

/// Unlocked lessons in catalog order.
#[must_use]
pub fn available_lessons<'a>(catalog: &'a Catalog, completed: &CompletedSet) -> Vec<&'a Lesson> {
    catalog
        .lessons()
        .iter()
        .filter(|l| is_unlocked(l, completed))
        .collect()
}

/// Prerequisites still outstanding, in declaration order.
#[must_use]
pub fn missing_prerequisites<'a>(lesson: &'a Lesson, completed: &CompletedSet) -> Vec<&'a LessonId> {
    lesson
        .prerequisites()
        .iter()
        .filter(|p| !completed.contains(p.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{id, lesson, small_catalog};
    use crate::model::LessonLevel;

    fn set(ids: &[&str]) -> CompletedSet {
        ids.iter().map(|raw| id(raw)).collect()
    }

    fn ids<'a>(lessons: &[&'a Lesson]) -> Vec<&'a str> {
        lessons.iter().map(|l| l.id().as_str()).collect()
    }

    #[test]
    fn lessons_without_prerequisites_are_always_unlocked() {
        let catalog = small_catalog();
        let root = catalog.get("A").unwrap();
        assert!(is_unlocked(root, &set(&[])));
        assert!(is_unlocked(root, &set(&["B", "C", "unrelated"])));
    }

    #[test]
    fn two_lesson_scenario() {
        let catalog = Catalog::new(vec![
            lesson("A", LessonLevel::Beginner, "Alphabet", &[]),
            lesson("B", LessonLevel::Beginner, "Alphabet", &["A"]),
        ])
        .unwrap();
        assert_eq!(ids(&available_lessons(&catalog, &set(&[]))), ["A"]);
        assert_eq!(ids(&available_lessons(&catalog, &set(&["A"]))), ["A", "B"]);
    }

    #[test]
    fn requires_every_prerequisite() {
        let catalog = Catalog::new(vec![
            lesson("A", LessonLevel::Beginner, "Alphabet", &[]),
            lesson("B", LessonLevel::Beginner, "Alphabet", &[]),
            lesson("C", LessonLevel::Beginner, "Alphabet", &["A", "B"]),
        ])
        .unwrap();
        let c = catalog.get("C").unwrap();
        assert!(!is_unlocked(c, &set(&["A"])));
        assert!(is_unlocked(c, &set(&["B", "A"])));
        assert_eq!(missing_prerequisites(c, &set(&["A"])), [&id("B")]);
        assert!(missing_prerequisites(c, &set(&["A", "B"])).is_empty());
    }

    #[test]
    fn availability_never_shrinks_as_completions_grow() {
        let catalog = small_catalog();
        let mut completed = CompletedSet::new();
        let mut previous = ids(&available_lessons(&catalog, &completed));
        for lesson in catalog.lessons() {
            completed.insert(lesson.id().clone());
            let current = ids(&available_lessons(&catalog, &completed));
            assert!(previous.iter().all(|p| current.contains(p)));
            previous = current;
        }
        assert_eq!(previous.len(), catalog.len());
    }

    #[test]
    fn available_is_an_ordered_subset_of_the_catalog() {
        let catalog = small_catalog();
        let available = available_lessons(&catalog, &set(&["A", "B"]));
        let positions: Vec<_> = available
            .iter()
            .map(|l| {
                catalog
                    .lessons()
                    .iter()
                    .position(|c| c.id() == l.id())
                    .unwrap()
            })
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids(&available), ["A", "B", "C"]);
    }
}
