use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};

use crate::ledger::ProgressBook;

/// Learner-level figures shown on the home and progress screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LearnerStats {
    pub lessons_completed: usize,
    /// Mean score over completed lessons, rounded half-up. 0 with no completions.
    pub average_score: u8,
    pub total_time_secs: u64,
    /// `total_time_secs` in whole minutes, rounded down.
    pub practice_minutes: u64,
    /// Consecutive days with a completion, ending today or yesterday.
    pub current_streak_days: u32,
}

impl LearnerStats {
    #[must_use]
    pub fn from_book(book: &ProgressBook, today: NaiveDate) -> Self {
        let completed: Vec<_> = book.records().filter(|r| r.completed()).collect();
        let lessons_completed = completed.len();

        let score_sum: u64 = completed.iter().map(|r| u64::from(r.score())).sum();
        let average_score = if lessons_completed == 0 {
            0
        } else {
            let n = u64::try_from(lessons_completed).unwrap_or(u64::MAX);
            u8::try_from((2 * score_sum + n) / (2 * n)).unwrap_or(100)
        };

        let total_time_secs = book
            .records()
            .map(|r| r.time_spent_secs())
            .fold(0_u64, u64::saturating_add);

        let days: BTreeSet<NaiveDate> = completed
            .iter()
            .flat_map(|r| r.completion_days().iter().copied())
            .collect();

        Self {
            lessons_completed,
            average_score,
            total_time_secs,
            practice_minutes: total_time_secs / 60,
            current_streak_days: streak_ending(&days, today),
        }
    }
}

// A streak survives until the end of the day after the last completion.
fn streak_ending(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let anchor = if days.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    let mut day = Some(anchor);
    while let Some(d) = day.filter(|d| days.contains(d)) {
        streak += 1;
        day = d.checked_sub_days(Days::new(1));
    }
    streak
}
