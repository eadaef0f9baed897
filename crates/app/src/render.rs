//! Plain-text output for the CLI subcommands.

use services::{LessonStatus, TutorError, TutorService};
use tutor_core::model::{Lesson, LessonProgress};
use tutor_core::{Catalog, LessonFilter, Progress};

fn bar(progress: Progress) -> String {
    const WIDTH: usize = 20;
    let filled = usize::from(progress.percentage) * WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(WIDTH - filled))
}

fn marker(status: Option<&LessonStatus>) -> &'static str {
    match status {
        Some(LessonStatus::Completed) => "x",
        Some(LessonStatus::Unlocked) => " ",
        Some(LessonStatus::Locked { .. }) | None => "-",
    }
}

fn line(tutor: &TutorService, lesson: &Lesson) -> String {
    let status = tutor.status(lesson.id().as_str());
    format!(
        "[{}] {:<5} {:<12} {:<18} {} ({} min)",
        marker(status.as_ref()),
        lesson.id(),
        lesson.level(),
        lesson.chapter(),
        lesson.title(),
        lesson.duration_min(),
    )
}

pub fn progress(tutor: &TutorService) {
    let overall = tutor.overall_progress();
    println!(
        "Overall      {} {:>3}%  {}/{}",
        bar(overall),
        overall.percentage,
        overall.completed,
        overall.total
    );
    for (level, p) in tutor.level_breakdown() {
        println!(
            "{:<12} {} {:>3}%  {}/{}",
            level.as_str(),
            bar(p),
            p.percentage,
            p.completed,
            p.total
        );
    }

    let stats = tutor.stats();
    println!();
    println!("Lessons completed: {}", stats.lessons_completed);
    println!("Average score:     {}", stats.average_score);
    println!("Practice time:     {} min", stats.practice_minutes);
    println!("Current streak:    {} day(s)", stats.current_streak_days);
}

pub fn lessons(tutor: &TutorService, filter: &LessonFilter) {
    let mut shown = 0;
    for lesson in tutor.catalog().search(filter) {
        println!("{}", line(tutor, lesson));
        shown += 1;
    }
    if shown == 0 {
        println!("No lessons match.");
    }
}

pub fn lesson(tutor: &TutorService, id: &str) -> Result<(), TutorError> {
    let lesson = tutor
        .catalog()
        .get(id)
        .ok_or_else(|| TutorError::NotFound(id.to_owned()))?;

    println!("{} {}", lesson.id(), lesson.title());
    println!("Level:    {}", lesson.level());
    println!("Chapter:  {}", lesson.chapter());
    println!("Duration: {} min", lesson.duration_min());
    if !lesson.description().is_empty() {
        println!();
        println!("{}", lesson.description());
    }

    println!();
    match tutor.status(id) {
        Some(LessonStatus::Locked { missing }) => {
            let missing: Vec<&str> = missing.iter().map(|m| m.as_str()).collect();
            println!("Locked. Complete first: {}", missing.join(", "));
        }
        Some(LessonStatus::Unlocked) => println!("Unlocked."),
        Some(LessonStatus::Completed) | None => {}
    }
    if let Some(record) = tutor.book().get(id) {
        record_line(record);
    }
    Ok(())
}

pub fn next(tutor: &TutorService) {
    match tutor.recommended() {
        Some(lesson) => println!("Next up: {}", line(tutor, lesson)),
        None => println!("Curriculum complete."),
    }
}

pub fn completed(tutor: &TutorService, record: &LessonProgress) {
    println!("Completed {}.", record.lesson_id());
    record_line(record);
    next(tutor);
}

pub fn catalog_summary(catalog: &Catalog) {
    let stats = catalog.stats();
    println!("OK: {} lessons, {} chapters", stats.total, catalog.chapters().len());
    for (level, count) in stats.by_level {
        println!("  {:<12} {count}", level.as_str());
    }
    println!(
        "  total {} min, average {} min",
        stats.total_duration_min, stats.average_duration_min
    );
}

fn record_line(record: &LessonProgress) {
    println!(
        "Best score {} after {} attempt(s), {} min practiced, last {}",
        record.score(),
        record.attempts(),
        record.time_spent_secs() / 60,
        record.completed_at().format("%Y-%m-%d"),
    );
}
