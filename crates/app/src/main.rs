use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use services::{Clock, TutorService};
use storage::{Storage, load_catalog};
use tutor_core::model::LessonLevel;
use tutor_core::{Catalog, CompletionInput, DEFAULT_LESSON_STEPS, LessonFilter};

mod logging;
mod render;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidLevel { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidLevel { raw } => write!(f, "invalid --level value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  tutor [progress]                      [--db <sqlite_url>] [--catalog <file>]");
    eprintln!("  tutor lessons [--level <level>] [--search <text>]");
    eprintln!("  tutor show <lesson_id>");
    eprintln!("  tutor next");
    eprintln!("  tutor complete <lesson_id> [--score <0-100>] [--minutes <m>] [--attempts <n>]");
    eprintln!("  tutor validate <catalog.json>");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://tutor.sqlite3   (or json:<file> for a JSON progress file)");
    eprintln!("  --catalog <built-in curriculum>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TUTOR_DB_URL, TUTOR_CATALOG, TUTOR_DEFAULT_STEPS, TUTOR_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Progress,
    Lessons(LessonFilter),
    Show {
        id: String,
    },
    Next,
    Complete {
        id: String,
        score: u32,
        minutes: Option<u64>,
        attempts: u32,
    },
    Validate {
        path: PathBuf,
    },
}

/// Settings shared by every subcommand. Flags override the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AppConfig {
    db_url: String,
    catalog_path: Option<PathBuf>,
    default_steps: u32,
}

impl AppConfig {
    fn from_env() -> Self {
        Self {
            db_url: std::env::var("TUTOR_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://tutor.sqlite3".into(), normalize_sqlite_url),
            catalog_path: std::env::var_os("TUTOR_CATALOG").map(PathBuf::from),
            default_steps: std::env::var("TUTOR_DEFAULT_STEPS")
                .ok()
                .and_then(|value| value.trim().parse::<u32>().ok())
                .filter(|steps| *steps > 0)
                .unwrap_or(DEFAULT_LESSON_STEPS),
        }
    }
}

struct Args {
    config: AppConfig,
    command: Command,
}

impl Args {
    fn parse(argv: Vec<String>, mut config: AppConfig) -> Result<Self, ArgsError> {
        let mut iter = argv.into_iter().peekable();
        let name = match iter.peek() {
            Some(first) if !first.starts_with('-') => iter.next(),
            _ => None,
        };

        let mut positional: Option<String> = None;
        let mut filter = LessonFilter::default();
        let mut score = 100;
        let mut minutes = None;
        let mut attempts = 1;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut iter, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    config.db_url = normalize_sqlite_url(value);
                }
                "--catalog" => {
                    config.catalog_path = Some(require_value(&mut iter, "--catalog")?.into());
                }
                "--level" => {
                    let raw = require_value(&mut iter, "--level")?;
                    let level = raw
                        .parse::<LessonLevel>()
                        .map_err(|_| ArgsError::InvalidLevel { raw: raw.clone() })?;
                    filter.level = Some(level);
                }
                "--search" => filter.query = Some(require_value(&mut iter, "--search")?),
                "--score" => score = parse_number(require_value(&mut iter, "--score")?, "--score")?,
                "--minutes" => {
                    minutes = Some(parse_number(
                        require_value(&mut iter, "--minutes")?,
                        "--minutes",
                    )?);
                }
                "--attempts" => {
                    attempts = parse_number(require_value(&mut iter, "--attempts")?, "--attempts")?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if !arg.starts_with('-') && positional.is_none() => positional = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match name.as_deref() {
            None | Some("progress") => Command::Progress,
            Some("lessons") => Command::Lessons(filter),
            Some("next") => Command::Next,
            Some("show") => Command::Show {
                id: positional.ok_or(ArgsError::MissingArgument { name: "lesson_id" })?,
            },
            Some("complete") => Command::Complete {
                id: positional.ok_or(ArgsError::MissingArgument { name: "lesson_id" })?,
                score,
                minutes,
                attempts,
            },
            Some("validate") => Command::Validate {
                path: positional
                    .ok_or(ArgsError::MissingArgument {
                        name: "catalog.json",
                    })?
                    .into(),
            },
            Some(other) => return Err(ArgsError::UnknownCommand(other.to_string())),
        };

        Ok(Self { config, command })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("json:") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn open_catalog(config: &AppConfig) -> Result<Catalog, Box<dyn std::error::Error>> {
    match &config.catalog_path {
        Some(path) => Ok(load_catalog(path)?),
        None => Ok(Catalog::builtin()?),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let parsed = Args::parse(argv, AppConfig::from_env()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    tracing::debug!(
        db_url = %parsed.config.db_url,
        catalog = ?parsed.config.catalog_path,
        default_steps = parsed.config.default_steps,
        "configuration resolved"
    );

    // Validation never touches the database.
    if let Command::Validate { path } = &parsed.command {
        let catalog = load_catalog(path)?;
        render::catalog_summary(&catalog);
        return Ok(());
    }

    let catalog = Arc::new(open_catalog(&parsed.config)?);
    let clock = Clock::default_clock();
    let tutor = match parsed.config.db_url.strip_prefix("json:") {
        Some(path) => TutorService::with_storage(Storage::json_file(path), clock, catalog).await?,
        None => TutorService::new_sqlite(&parsed.config.db_url, clock, catalog).await?,
    };
    let mut tutor = tutor.with_default_steps(parsed.config.default_steps);

    match parsed.command {
        Command::Progress => render::progress(&tutor),
        Command::Lessons(filter) => render::lessons(&tutor, &filter),
        Command::Show { id } => render::lesson(&tutor, &id)?,
        Command::Next => render::next(&tutor),
        Command::Complete {
            id,
            score,
            minutes,
            attempts,
        } => {
            tutor.start_lesson(&id)?;
            let minutes = minutes.unwrap_or_else(|| {
                tutor
                    .current_lesson()
                    .map_or(0, |lesson| u64::from(lesson.duration_min()))
            });
            let input = CompletionInput {
                score,
                attempts,
                time_spent_secs: minutes.saturating_mul(60),
            };
            let record = tutor.complete_lesson(input).await?;
            render::completed(&tutor, &record);
        }
        Command::Validate { .. } => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    logging::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            db_url: "sqlite::memory:".into(),
            catalog_path: None,
            default_steps: DEFAULT_LESSON_STEPS,
        }
    }

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(args.iter().map(|a| (*a).to_string()).collect(), config())
    }

    #[test]
    fn no_subcommand_shows_progress() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.command, Command::Progress);
        assert_eq!(args.config, config());
    }

    #[test]
    fn lessons_takes_level_and_search() {
        let args = parse(&["lessons", "--level", "intermediate", "--search", "contraction"])
            .unwrap();
        assert_eq!(
            args.command,
            Command::Lessons(LessonFilter {
                query: Some("contraction".into()),
                level: Some(LessonLevel::Intermediate),
            })
        );
    }

    #[test]
    fn complete_defaults_and_overrides() {
        let args = parse(&["complete", "L001"]).unwrap();
        assert_eq!(
            args.command,
            Command::Complete {
                id: "L001".into(),
                score: 100,
                minutes: None,
                attempts: 1,
            }
        );

        let args = parse(&["complete", "L002", "--score", "85", "--minutes", "12"]).unwrap();
        let Command::Complete { score, minutes, .. } = args.command else {
            panic!("expected complete");
        };
        assert_eq!((score, minutes), (85, Some(12)));
    }

    #[test]
    fn global_flags_apply_to_any_command() {
        let args = parse(&["next", "--db", "sqlite://x.db", "--catalog", "c.json"]).unwrap();
        assert_eq!(args.config.db_url, "sqlite://x.db");
        assert_eq!(args.config.catalog_path, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(
            parse(&["show"]),
            Err(ArgsError::MissingArgument { .. })
        ));
        assert!(matches!(
            parse(&["lessons", "--level", "grandmaster"]),
            Err(ArgsError::InvalidLevel { .. })
        ));
        assert!(matches!(
            parse(&["complete", "L001", "--score", "lots"]),
            Err(ArgsError::InvalidNumber { flag: "--score", .. })
        ));
        assert!(matches!(
            parse(&["teleport"]),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert!(matches!(
            parse(&["show", "L001", "L002"]),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(normalize_sqlite_url("sqlite:///tmp/t.db".into()), "sqlite:///tmp/t.db");
        assert_eq!(normalize_sqlite_url("sqlite:/tmp/t.db".into()), "sqlite:///tmp/t.db");
        assert_eq!(normalize_sqlite_url("json:progress.json".into()), "json:progress.json");
    }
}
