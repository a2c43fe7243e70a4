//! Line-oriented front end over one course session.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use course_core::model::{AssignmentId, CourseId, Lesson};
use services::{
    AppServices, LessonProgress, LessonProgression, LoadFailure, ProgressionError,
    SessionContext, SessionStatus,
};

const LIST_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Next,
    Prev,
    /// 1-based, as shown in the outline.
    Jump(usize),
    Submit(String),
    Learner(String),
    Outline,
    Courses,
    Open(CourseId),
    Review,
    Approve(AssignmentId),
    Delete(AssignmentId),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArgument(&'static str),
    InvalidNumber(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => f.write_str("empty command"),
            CommandError::Unknown(word) => write!(f, "unknown command: {word} (try `help`)"),
            CommandError::MissingArgument(what) => write!(f, "missing {what}"),
            CommandError::InvalidNumber(raw) => write!(f, "not a number: {raw}"),
        }
    }
}

impl std::error::Error for CommandError {}

fn required<'a>(rest: &'a str, what: &'static str) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument(what))
    } else {
        Ok(rest)
    }
}

fn id<T: FromStr>(rest: &str, what: &'static str) -> Result<T, CommandError> {
    let raw = required(rest, what)?;
    raw.parse()
        .map_err(|_| CommandError::InvalidNumber(raw.to_owned()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        match word.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "show" | "s" => Ok(Command::Show),
            "next" | "n" => Ok(Command::Next),
            "prev" | "p" => Ok(Command::Prev),
            "jump" | "j" => {
                let position: usize = id(rest, "lesson number")?;
                if position == 0 {
                    return Err(CommandError::InvalidNumber(rest.to_owned()));
                }
                Ok(Command::Jump(position))
            }
            // Keeps the text verbatim; blank input is caught by the controller.
            "submit" => Ok(Command::Submit(rest.to_owned())),
            "learner" => Ok(Command::Learner(required(rest, "learner name")?.to_owned())),
            "outline" | "o" => Ok(Command::Outline),
            "courses" => Ok(Command::Courses),
            "open" => Ok(Command::Open(id(rest, "course id")?)),
            "review" => Ok(Command::Review),
            "approve" => Ok(Command::Approve(id(rest, "assignment id")?)),
            "delete" => Ok(Command::Delete(id(rest, "assignment id")?)),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Terminal state: the open session, who is learning, and the run's context.
pub struct Repl<W> {
    services: AppServices,
    ctx: SessionContext,
    progression: LessonProgression,
    learner: Option<String>,
    out: W,
}

impl<W: Write> Repl<W> {
    pub fn new(services: AppServices, ctx: SessionContext, out: W) -> Self {
        let progression = services.progression().session();
        Self {
            services,
            ctx,
            progression,
            learner: None,
            out,
        }
    }

    #[must_use]
    pub fn with_learner(mut self, learner: Option<String>) -> Self {
        self.learner = learner;
        self
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Parse and run one input line. Command failures are printed, not returned.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` only when writing output fails.
    pub async fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        match line.parse::<Command>() {
            Ok(command) => self.execute(command).await,
            Err(CommandError::Empty) => Ok(Flow::Continue),
            Err(err) => {
                writeln!(self.out, "{err}")?;
                Ok(Flow::Continue)
            }
        }
    }

    /// # Errors
    ///
    /// Returns `io::Error` only when writing output fails.
    pub async fn execute(&mut self, command: Command) -> io::Result<Flow> {
        match command {
            Command::Show => self.show()?,
            Command::Next => {
                let learner = self.learner.clone().unwrap_or_default();
                let moved = self.progression.move_to_next(&learner).await;
                match moved {
                    Ok(_) => self.show()?,
                    Err(err) => self.report(&err)?,
                }
            }
            Command::Prev => {
                if self.progression.move_to_previous() {
                    self.show()?;
                } else {
                    writeln!(self.out, "already at the first lesson")?;
                }
            }
            Command::Jump(position) => match self.progression.jump_to(position - 1) {
                Ok(()) => self.show()?,
                Err(err) => self.report(&err)?,
            },
            Command::Submit(content) => {
                let learner = self.learner.clone().unwrap_or_default();
                let submitted = self.progression.submit_assignment(&learner, &content).await;
                match submitted {
                    Ok(assignment) => writeln!(
                        self.out,
                        "assignment #{} submitted, pending approval",
                        assignment.id()
                    )?,
                    Err(err) => self.report(&err)?,
                }
            }
            Command::Learner(name) => {
                writeln!(self.out, "learning as {}", name.trim())?;
                self.learner = Some(name);
            }
            Command::Outline => self.outline()?,
            Command::Courses => self.courses().await?,
            Command::Open(course_id) => self.open(course_id).await?,
            Command::Review => self.review().await?,
            Command::Approve(id) => {
                let approved = self.services.review().approve(&self.ctx, id).await;
                match approved {
                    Ok(()) => writeln!(self.out, "assignment #{id} approved")?,
                    Err(err) => writeln!(self.out, "{err}")?,
                }
            }
            Command::Delete(id) => {
                let deleted = self.services.review().delete(&self.ctx, id).await;
                match deleted {
                    Ok(()) => writeln!(self.out, "assignment #{id} deleted")?,
                    Err(err) => writeln!(self.out, "{err}")?,
                }
            }
            Command::Help => self.help()?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Replace the current session with one on `course_id`, then show it.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` only when writing output fails.
    pub async fn open(&mut self, course_id: CourseId) -> io::Result<()> {
        self.progression = self.services.progression().session();
        // Load failures land in the session status, which `show` renders.
        let _ = self.progression.open(course_id).await;
        self.show()
    }

    fn report(&mut self, err: &ProgressionError) -> io::Result<()> {
        match err {
            ProgressionError::Validation(_) if self.learner.is_none() => {
                writeln!(self.out, "{err} (set one with `learner <name>`)")
            }
            _ => writeln!(self.out, "{err}"),
        }
    }

    fn show(&mut self) -> io::Result<()> {
        match self.progression.status() {
            SessionStatus::Loading => writeln!(self.out, "no course open (try `courses`)"),
            SessionStatus::Failed {
                failure: LoadFailure::CourseNotFound,
            } => writeln!(self.out, "course not found"),
            SessionStatus::Failed {
                failure: LoadFailure::Store(message),
            } => writeln!(self.out, "could not load course: {message}"),
            SessionStatus::Empty => writeln!(self.out, "no lessons available"),
            SessionStatus::Loaded { .. } => {
                let (Some(lesson), Some(progress)) =
                    (self.progression.current_lesson(), self.progression.progress())
                else {
                    return Ok(());
                };
                self.render_lesson(&lesson, &progress)
            }
        }
    }

    fn render_lesson(&mut self, lesson: &Lesson, progress: &LessonProgress) -> io::Result<()> {
        if let Some(course) = self.progression.course() {
            writeln!(self.out, "{}", course.title())?;
        }
        writeln!(
            self.out,
            "Lesson {} of {}: {}",
            progress.position,
            progress.total,
            lesson.title()
        )?;
        if !lesson.description().is_empty() {
            writeln!(self.out, "{}", lesson.description())?;
        }
        if let Some(embed) = lesson.embed_url() {
            writeln!(self.out, "video: {embed}")?;
        } else if let Some(video) = lesson.video_url() {
            writeln!(self.out, "video: {video}")?;
        }
        if !lesson.content().is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "{}", lesson.content())?;
        }
        if let Some(prompt) = lesson.assignment() {
            writeln!(self.out)?;
            writeln!(self.out, "assignment: {prompt}")?;
        }
        let mut nav = Vec::new();
        if !progress.is_first {
            nav.push("prev");
        }
        if !progress.is_last {
            nav.push("next");
        }
        if !nav.is_empty() {
            writeln!(self.out, "[{}]", nav.join(" | "))?;
        }
        Ok(())
    }

    fn outline(&mut self) -> io::Result<()> {
        let items = self.progression.outline();
        if items.is_empty() {
            return writeln!(self.out, "no lessons loaded");
        }
        for item in items {
            let marker = if item.is_current {
                '>'
            } else if item.is_before_cursor {
                '✓'
            } else {
                ' '
            };
            writeln!(self.out, "{marker} {}. {}", item.index + 1, item.title)?;
        }
        Ok(())
    }

    async fn courses(&mut self) -> io::Result<()> {
        let listed = self.services.catalog().list_courses(LIST_LIMIT).await;
        match listed {
            Ok(courses) if courses.is_empty() => writeln!(self.out, "no courses yet"),
            Ok(courses) => {
                for course in courses {
                    let mut line = format!("{:>4}  {}", course.id().to_string(), course.title());
                    let details: Vec<&str> = [course.level(), course.duration(), course.category()]
                        .into_iter()
                        .filter(|value| !value.is_empty())
                        .collect();
                    if !details.is_empty() {
                        line.push_str(&format!(" ({})", details.join(", ")));
                    }
                    writeln!(self.out, "{line}")?;
                }
                Ok(())
            }
            Err(err) => writeln!(self.out, "{err}"),
        }
    }

    async fn review(&mut self) -> io::Result<()> {
        let listings = match self.services.review().list(&self.ctx, LIST_LIMIT).await {
            Ok(listings) => listings,
            Err(err) => return writeln!(self.out, "{err}"),
        };
        if listings.is_empty() {
            return writeln!(self.out, "no assignments submitted");
        }
        for listing in listings {
            let assignment = &listing.assignment;
            writeln!(
                self.out,
                "#{} [{}] {} on {} / {} at {}",
                assignment.id(),
                if assignment.is_approved() {
                    "approved"
                } else {
                    "pending"
                },
                assignment.learner(),
                listing.course_title.as_deref().unwrap_or("?"),
                listing.lesson_title.as_deref().unwrap_or("?"),
                assignment.created_at().format("%Y-%m-%d %H:%M"),
            )?;
            writeln!(self.out, "    {}", assignment.content())?;
        }
        Ok(())
    }

    fn help(&mut self) -> io::Result<()> {
        let mut lines = vec![
            "show               current lesson",
            "next               next lesson (needs an approved assignment)",
            "prev               previous lesson",
            "jump <n>           go to lesson n",
            "outline            lesson list",
            "learner <name>     who is learning",
            "submit <text>      submit the assignment for this lesson",
            "courses            list courses",
            "open <course id>   open another course",
        ];
        if self.ctx.is_admin() {
            lines.extend([
                "review             list submitted assignments",
                "approve <id>       approve an assignment",
                "delete <id>        delete an assignment",
            ]);
        }
        lines.push("quit               leave");
        for line in lines {
            writeln!(self.out, "  {line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use course_core::model::{Course, LessonId};
    use course_core::time::fixed_now;
    use services::{Clock, StaticAuthCheck};
    use storage::repository::Storage;

    #[test]
    fn parses_commands() {
        assert_eq!("  next ".parse::<Command>().unwrap(), Command::Next);
        assert_eq!("jump 3".parse::<Command>().unwrap(), Command::Jump(3));
        assert_eq!(
            "submit my  answer".parse::<Command>().unwrap(),
            Command::Submit("my  answer".into())
        );
        assert_eq!(
            "open 2".parse::<Command>().unwrap(),
            Command::Open(CourseId::new(2))
        );
        assert_eq!("".parse::<Command>().unwrap_err(), CommandError::Empty);
        assert_eq!(
            "jump".parse::<Command>().unwrap_err(),
            CommandError::MissingArgument("lesson number")
        );
        assert_eq!(
            "jump 0".parse::<Command>().unwrap_err(),
            CommandError::InvalidNumber("0".into())
        );
        assert!(matches!(
            "dance".parse::<Command>().unwrap_err(),
            CommandError::Unknown(_)
        ));
    }

    async fn repl(admin: bool) -> Repl<Vec<u8>> {
        let storage = Storage::in_memory();
        let course_id = CourseId::new(1);
        storage
            .courses
            .upsert_course(&Course::new(course_id, "Rust Foundations", fixed_now()).unwrap())
            .await
            .unwrap();
        let lessons: Vec<Lesson> = [(1, "Ownership"), (2, "Borrowing")]
            .into_iter()
            .map(|(id, title)| {
                Lesson::new(
                    LessonId::new(id),
                    course_id,
                    title,
                    fixed_now() + Duration::minutes(i64::try_from(id).unwrap()),
                )
                .unwrap()
                .with_assignment(Some(format!("Explain {title}")))
            })
            .collect();
        storage
            .courses
            .replace_lessons(course_id, &lessons)
            .await
            .unwrap();

        let services = AppServices::from_storage(
            &storage,
            Clock::fixed(fixed_now()),
            Default::default(),
        );
        let ctx = SessionContext::from_auth(&StaticAuthCheck::new(admin));
        let mut repl = Repl::new(services, ctx, Vec::new()).with_learner(Some("alice".into()));
        repl.open(course_id).await.unwrap();
        repl
    }

    fn printed(repl: &Repl<Vec<u8>>) -> String {
        String::from_utf8_lossy(repl.output()).into_owned()
    }

    #[tokio::test]
    async fn submit_then_approve_unlocks_next_lesson() {
        let mut repl = repl(true).await;
        assert!(printed(&repl).contains("Lesson 1 of 2: Ownership"));

        repl.handle_line("next").await.unwrap();
        assert!(printed(&repl).contains("not been approved"));

        repl.handle_line("submit moves transfer ownership").await.unwrap();
        assert!(printed(&repl).contains("assignment #1 submitted, pending approval"));

        repl.handle_line("approve 1").await.unwrap();
        repl.handle_line("next").await.unwrap();
        assert!(printed(&repl).contains("Lesson 2 of 2: Borrowing"));

        repl.handle_line("outline").await.unwrap();
        assert!(printed(&repl).contains("✓ 1. Ownership"));
        assert!(printed(&repl).contains("> 2. Borrowing"));
    }

    #[tokio::test]
    async fn learner_cannot_approve() {
        let mut repl = repl(false).await;
        repl.handle_line("review").await.unwrap();
        assert!(printed(&repl).contains("admin session required"));
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let mut repl = repl(false).await;
        assert_eq!(repl.handle_line("quit").await.unwrap(), Flow::Quit);
        assert_eq!(repl.handle_line("prev").await.unwrap(), Flow::Continue);
        assert!(printed(&repl).contains("already at the first lesson"));
    }
}
