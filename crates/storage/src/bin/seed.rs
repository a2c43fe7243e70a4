use std::fmt;

use chrono::{DateTime, Duration, Utc};
use course_core::model::{Course, CourseId, Lesson, LessonId};
use course_core::time::Clock;
use serde::Deserialize;
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    catalog: Option<String>,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("COURSE_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut catalog = std::env::var("COURSE_CATALOG").ok();
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--catalog" => {
                    catalog = Some(require_value(&mut args, "--catalog")?);
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            catalog,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --catalog <file.json>     Courses and lessons to load (default: built-in sample)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  COURSE_DB_URL, COURSE_CATALOG");
}

#[derive(Debug, Deserialize)]
struct CatalogCourse {
    id: u64,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    level: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    lessons: Vec<CatalogLesson>,
}

#[derive(Debug, Deserialize)]
struct CatalogLesson {
    id: u64,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    assignment: Option<String>,
}

fn sample_catalog() -> Vec<CatalogCourse> {
    let lesson = |id: u64, title: &str, assignment: &str| CatalogLesson {
        id,
        title: title.into(),
        description: format!("{title} walkthrough"),
        content: format!("# {title}\n\nRead the notes, then complete the assignment."),
        video_url: None,
        assignment: Some(assignment.into()),
    };
    vec![CatalogCourse {
        id: 1,
        title: "Rust Foundations".into(),
        description: "From ownership to traits".into(),
        duration: "3 weeks".into(),
        category: "Programming".into(),
        level: "Beginner".into(),
        image_url: None,
        lessons: vec![
            lesson(1, "Ownership", "Explain a move with your own example."),
            lesson(2, "Borrowing", "Fix a borrow checker error and describe the fix."),
            lesson(3, "Traits", "Write a trait with a default method."),
        ],
    }]
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let catalog = match &args.catalog {
        Some(path) => serde_json::from_str::<Vec<CatalogCourse>>(&std::fs::read_to_string(path)?)?,
        None => sample_catalog(),
    };

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let mut lesson_total = 0usize;
    for entry in &catalog {
        let course_id = CourseId::new(entry.id);
        let course = Course::new(course_id, entry.title.clone(), now)?
            .with_description(entry.description.clone())
            .with_duration(entry.duration.clone())
            .with_category(entry.category.clone())
            .with_level(entry.level.clone())
            .with_image_url(entry.image_url.clone());
        storage.courses.upsert_course(&course).await?;

        // Unlock order follows creation time, so space lessons out in file order.
        let mut clock = Clock::fixed(now);
        let mut lessons = Vec::with_capacity(entry.lessons.len());
        for item in &entry.lessons {
            let lesson = Lesson::new(
                LessonId::new(item.id),
                course_id,
                item.title.clone(),
                clock.now(),
            )?
            .with_description(item.description.clone())
            .with_content(item.content.clone())
            .with_assignment(item.assignment.clone())
            .with_video_url(item.video_url.clone());
            lessons.push(lesson);
            clock.advance(Duration::seconds(1));
        }
        storage.courses.replace_lessons(course_id, &lessons).await?;
        lesson_total += lessons.len();
    }

    println!(
        "Seeded {} courses with {} lessons into {}",
        catalog.len(),
        lesson_total,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
