use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use course_core::Clock;
use course_core::model::{
    ApprovalPolicy, Assignment, Course, CourseId, LearnerName, Lesson, NewAssignment,
    SubmissionContent, lesson_order_key,
};
use storage::repository::{AssignmentStore, ContentStore, StorageError};

use super::guard::InFlight;
use super::state::{CursorPosition, LessonProgress, LoadFailure, OutlineItem, SessionStatus};
use crate::error::{Operation, ProgressionError};

#[derive(Debug, Clone)]
enum Phase {
    Loading,
    Failed(LoadFailure),
    Empty {
        course: Course,
    },
    Loaded {
        course: Course,
        lessons: Vec<Lesson>,
        cursor: usize,
    },
}

#[derive(Debug)]
struct Session {
    // Bumped by every open; results computed under an older value are dropped.
    epoch: u64,
    phase: Phase,
}

/// Sequential lesson navigation for one learner, gated on assignment approval.
///
/// Methods take `&self` so a front end can share the controller behind an `Arc`.
/// The session lock is only held for snapshot reads and writes, never across
/// a store call.
pub struct LessonProgression {
    content: Arc<dyn ContentStore>,
    assignments: Arc<dyn AssignmentStore>,
    clock: Clock,
    policy: ApprovalPolicy,
    session: Mutex<Session>,
    in_flight: InFlight,
}

impl LessonProgression {
    #[must_use]
    pub fn new(content: Arc<dyn ContentStore>, assignments: Arc<dyn AssignmentStore>) -> Self {
        Self {
            content,
            assignments,
            clock: Clock::default(),
            policy: ApprovalPolicy::default(),
            session: Mutex::new(Session {
                epoch: 0,
                phase: Phase::Loading,
            }),
            in_flight: InFlight::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a course and its lessons, replacing any previous session.
    ///
    /// On success the cursor sits on the first lesson.
    ///
    /// # Errors
    ///
    /// Returns `CourseNotFound`, `NoLessons`, `Storage` for fetch failures, or
    /// `Busy` when another open is still running. The same outcome is visible
    /// afterwards through [`status`](Self::status).
    pub async fn open(&self, course_id: CourseId) -> Result<(), ProgressionError> {
        let _guard = self.in_flight.acquire(Operation::Open)?;
        {
            let mut session = self.lock();
            session.epoch += 1;
            session.phase = Phase::Loading;
        }

        let fetched = self.fetch(course_id).await;

        let mut session = self.lock();
        match fetched {
            Ok((course, lessons)) if lessons.is_empty() => {
                info!(course_id = %course_id, "course has no lessons");
                session.phase = Phase::Empty { course };
                Err(ProgressionError::NoLessons)
            }
            Ok((course, lessons)) => {
                info!(course_id = %course_id, lessons = lessons.len(), "course session opened");
                session.phase = Phase::Loaded {
                    course,
                    lessons,
                    cursor: 0,
                };
                Ok(())
            }
            Err(err) => {
                let failure = match &err {
                    ProgressionError::CourseNotFound => LoadFailure::CourseNotFound,
                    other => LoadFailure::Store(other.to_string()),
                };
                warn!(course_id = %course_id, error = %err, "course session failed to load");
                session.phase = Phase::Failed(failure);
                Err(err)
            }
        }
    }

    async fn fetch(&self, course_id: CourseId) -> Result<(Course, Vec<Lesson>), ProgressionError> {
        let course = match self.content.get_course(course_id).await {
            Ok(Some(course)) => course,
            Ok(None) | Err(StorageError::NotFound) => return Err(ProgressionError::CourseNotFound),
            Err(err) => return Err(err.into()),
        };
        let mut lessons = self.content.list_lessons(course_id).await?;
        // Stores order by creation time; ties settle on lesson id.
        lessons.sort_by_key(lesson_order_key);
        Ok((course, lessons))
    }

    /// Step back one lesson. Returns whether the cursor moved.
    pub fn move_to_previous(&self) -> bool {
        let mut session = self.lock();
        let Phase::Loaded { cursor, .. } = &mut session.phase else {
            return false;
        };
        if *cursor == 0 {
            return false;
        }
        *cursor -= 1;
        debug!(cursor = *cursor, "moved to previous lesson");
        true
    }

    /// Advance past the current lesson once `learner`'s assignment for it is approved.
    ///
    /// Returns the new cursor. A failed approval lookup counts as not approved;
    /// the store error is logged and not surfaced.
    ///
    /// # Errors
    ///
    /// Returns `NotLoaded`, `AtLastLesson`, `Validation` for a blank learner,
    /// `Busy` while another advance runs, `NotApproved`, or `Superseded` when
    /// the session was reopened or the cursor moved during the lookup.
    pub async fn move_to_next(&self, learner: &str) -> Result<usize, ProgressionError> {
        let (epoch, checked, lesson_id) = {
            let session = self.lock();
            let Phase::Loaded {
                lessons, cursor, ..
            } = &session.phase
            else {
                return Err(ProgressionError::NotLoaded);
            };
            if *cursor + 1 >= lessons.len() {
                return Err(ProgressionError::AtLastLesson);
            }
            (session.epoch, *cursor, lessons[*cursor].id())
        };
        let learner = LearnerName::parse(learner)?;
        let _guard = self.in_flight.acquire(Operation::Advance)?;

        let approval = match self
            .assignments
            .get_approval(lesson_id, &learner, self.policy)
            .await
        {
            Ok(approval) => approval,
            Err(err) => {
                warn!(
                    lesson_id = %lesson_id,
                    learner = %learner,
                    error = %err,
                    "approval lookup failed, keeping lesson locked"
                );
                None
            }
        };
        if !approval.is_some_and(|a| a.approved) {
            debug!(lesson_id = %lesson_id, learner = %learner, "lesson not approved");
            return Err(ProgressionError::NotApproved);
        }

        let mut session = self.lock();
        if session.epoch != epoch {
            return Err(ProgressionError::Superseded);
        }
        let Phase::Loaded {
            lessons, cursor, ..
        } = &mut session.phase
        else {
            return Err(ProgressionError::NotLoaded);
        };
        if *cursor != checked {
            debug!(checked, cursor = *cursor, "cursor moved during approval lookup");
            return Err(ProgressionError::Superseded);
        }
        let next = (checked + 1).min(lessons.len() - 1);
        *cursor = next;
        debug!(cursor = next, "moved to next lesson");
        Ok(next)
    }

    /// Jump straight to a lesson. The approval gate does not apply here.
    ///
    /// # Errors
    ///
    /// Returns `NotLoaded` or `OutOfRange`.
    pub fn jump_to(&self, index: usize) -> Result<(), ProgressionError> {
        let mut session = self.lock();
        let Phase::Loaded {
            lessons, cursor, ..
        } = &mut session.phase
        else {
            return Err(ProgressionError::NotLoaded);
        };
        if index >= lessons.len() {
            return Err(ProgressionError::OutOfRange {
                index,
                len: lessons.len(),
            });
        }
        *cursor = index;
        debug!(cursor = index, "jumped to lesson");
        Ok(())
    }

    /// Submit `content` for the current lesson. The stored assignment starts
    /// unapproved and the cursor does not move.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for blank input, `NotLoaded`, `Busy` while another
    /// submission runs, or `Storage` when the store rejects the insert.
    pub async fn submit_assignment(
        &self,
        learner: &str,
        content: &str,
    ) -> Result<Assignment, ProgressionError> {
        let learner = LearnerName::parse(learner)?;
        let content = SubmissionContent::parse(content)?;
        let (lesson_id, course_id) = {
            let session = self.lock();
            let Phase::Loaded {
                course,
                lessons,
                cursor,
            } = &session.phase
            else {
                return Err(ProgressionError::NotLoaded);
            };
            (lessons[*cursor].id(), course.id())
        };
        let _guard = self.in_flight.acquire(Operation::Submit)?;

        let draft = NewAssignment::new(learner, lesson_id, course_id, content, self.clock.now());
        let assignment = self.assignments.create_assignment(draft).await?;
        info!(
            assignment_id = %assignment.id(),
            lesson_id = %lesson_id,
            learner = %assignment.learner(),
            "assignment submitted, pending approval"
        );
        Ok(assignment)
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match &self.lock().phase {
            Phase::Loading => SessionStatus::Loading,
            Phase::Failed(failure) => SessionStatus::Failed {
                failure: failure.clone(),
            },
            Phase::Empty { .. } => SessionStatus::Empty,
            Phase::Loaded {
                lessons, cursor, ..
            } => SessionStatus::Loaded {
                cursor: *cursor,
                position: CursorPosition::of(*cursor, lessons.len()),
            },
        }
    }

    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        match &self.lock().phase {
            Phase::Loaded { cursor, .. } => Some(*cursor),
            _ => None,
        }
    }

    #[must_use]
    pub fn course(&self) -> Option<Course> {
        match &self.lock().phase {
            Phase::Empty { course } | Phase::Loaded { course, .. } => Some(course.clone()),
            Phase::Loading | Phase::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn lessons(&self) -> Vec<Lesson> {
        match &self.lock().phase {
            Phase::Loaded { lessons, .. } => lessons.clone(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn current_lesson(&self) -> Option<Lesson> {
        match &self.lock().phase {
            Phase::Loaded {
                lessons, cursor, ..
            } => lessons.get(*cursor).cloned(),
            _ => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Option<LessonProgress> {
        match &self.lock().phase {
            Phase::Loaded {
                lessons, cursor, ..
            } => Some(LessonProgress {
                position: cursor + 1,
                total: lessons.len(),
                is_first: *cursor == 0,
                is_last: cursor + 1 == lessons.len(),
            }),
            _ => None,
        }
    }

    #[must_use]
    pub fn outline(&self) -> Vec<OutlineItem> {
        match &self.lock().phase {
            Phase::Loaded {
                lessons, cursor, ..
            } => lessons
                .iter()
                .enumerate()
                .map(|(index, lesson)| OutlineItem {
                    index,
                    title: lesson.title().to_owned(),
                    is_current: index == *cursor,
                    is_before_cursor: index < *cursor,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use course_core::model::LessonId;
    use course_core::time::fixed_now;
    use storage::repository::{CourseWriter, InMemoryRepository};

    async fn seeded(lesson_count: u64) -> Arc<InMemoryRepository> {
        let repo = Arc::new(InMemoryRepository::new());
        let course_id = CourseId::new(1);
        repo.upsert_course(&Course::new(course_id, "Rust", fixed_now()).unwrap())
            .await
            .unwrap();
        let lessons: Vec<Lesson> = (1..=lesson_count)
            .map(|id| {
                Lesson::new(
                    LessonId::new(id),
                    course_id,
                    format!("Lesson {id}"),
                    fixed_now() + Duration::minutes(i64::try_from(id).unwrap()),
                )
                .unwrap()
            })
            .collect();
        repo.replace_lessons(course_id, &lessons).await.unwrap();
        repo
    }

    fn controller(repo: &Arc<InMemoryRepository>) -> LessonProgression {
        LessonProgression::new(repo.clone(), repo.clone()).with_clock(Clock::fixed(fixed_now()))
    }

    #[tokio::test]
    async fn unopened_session_rejects_navigation() {
        let repo = seeded(2).await;
        let progression = controller(&repo);

        assert_eq!(progression.status(), SessionStatus::Loading);
        assert!(!progression.move_to_previous());
        assert!(matches!(
            progression.jump_to(0).unwrap_err(),
            ProgressionError::NotLoaded
        ));
        assert!(matches!(
            progression.move_to_next("alice").await.unwrap_err(),
            ProgressionError::NotLoaded
        ));
        assert!(progression.progress().is_none());
    }

    #[tokio::test]
    async fn read_models_track_cursor() {
        let repo = seeded(3).await;
        let progression = controller(&repo);
        progression.open(CourseId::new(1)).await.unwrap();
        progression.jump_to(1).unwrap();

        assert_eq!(
            progression.progress(),
            Some(LessonProgress {
                position: 2,
                total: 3,
                is_first: false,
                is_last: false,
            })
        );
        let outline = progression.outline();
        assert_eq!(outline.len(), 3);
        assert!(outline[0].is_before_cursor && !outline[0].is_current);
        assert!(outline[1].is_current && !outline[1].is_before_cursor);
        assert!(!outline[2].is_current && !outline[2].is_before_cursor);
        assert_eq!(
            progression.current_lesson().map(|l| l.id()),
            Some(LessonId::new(2))
        );
        assert_eq!(progression.course().map(|c| c.id()), Some(CourseId::new(1)));
    }

    #[tokio::test]
    async fn single_lesson_course_is_last() {
        let repo = seeded(1).await;
        let progression = controller(&repo);
        progression.open(CourseId::new(1)).await.unwrap();

        assert_eq!(
            progression.status(),
            SessionStatus::Loaded {
                cursor: 0,
                position: CursorPosition::Last,
            }
        );
        let progress = progression.progress().unwrap();
        assert!(progress.is_first && progress.is_last);
        assert!(matches!(
            progression.move_to_next("alice").await.unwrap_err(),
            ProgressionError::AtLastLesson
        ));
    }

    #[tokio::test]
    async fn blank_learner_is_rejected_before_lookup() {
        let repo = seeded(2).await;
        let progression = controller(&repo);
        progression.open(CourseId::new(1)).await.unwrap();

        let err = progression.move_to_next("   ").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert_eq!(progression.cursor(), Some(0));
    }
}
