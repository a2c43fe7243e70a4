use async_trait::async_trait;
use course_core::model::{
    Approval, ApprovalPolicy, ApprovalRecord, Assignment, AssignmentId, Course, CourseId,
    LearnerName, Lesson, LessonId, NewAssignment, lesson_order_key,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// An assignment joined with the titles of the lesson and course it belongs to.
///
/// Titles are `None` when the lesson or course has since been removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentListing {
    pub assignment: Assignment,
    pub lesson_title: Option<String>,
    pub course_title: Option<String>,
}

/// Read access to published courses and their lessons.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a course by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached or the row cannot be decoded.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Lessons of a course in unlock order (`created_at` ascending, id breaking ties).
    ///
    /// An unknown course yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached or rows cannot be decoded.
    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError>;

    /// Newest courses first, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached or rows cannot be decoded.
    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError>;
}

/// Write access to course content. Used by seeding and tests.
#[async_trait]
pub trait CourseWriter: Send + Sync {
    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Replace every lesson of a course with the given ones.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a lesson belongs to a different course,
    /// or other storage errors.
    async fn replace_lessons(
        &self,
        course_id: CourseId,
        lessons: &[Lesson],
    ) -> Result<(), StorageError>;
}

/// Learner submissions and their approval state.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Approval state of every submission for a (lesson, learner) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached or rows cannot be decoded.
    async fn approvals(
        &self,
        lesson_id: LessonId,
        learner: &LearnerName,
    ) -> Result<Vec<ApprovalRecord>, StorageError>;

    /// Resolve the approval of a (lesson, learner) pair under `policy`.
    ///
    /// Returns `Ok(None)` when the learner never submitted for this lesson.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`AssignmentStore::approvals`].
    async fn get_approval(
        &self,
        lesson_id: LessonId,
        learner: &LearnerName,
        policy: ApprovalPolicy,
    ) -> Result<Option<Approval>, StorageError> {
        let records = self.approvals(lesson_id, learner).await?;
        Ok(policy.resolve(&records))
    }

    /// Store a new, unapproved submission.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the submission cannot be stored.
    async fn create_assignment(&self, draft: NewAssignment) -> Result<Assignment, StorageError>;

    /// Newest submissions first, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached or rows cannot be decoded.
    async fn list_assignments(&self, limit: u32) -> Result<Vec<AssignmentListing>, StorageError>;

    /// Set the approval flag of a submission.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the submission does not exist.
    async fn set_approved(&self, id: AssignmentId, approved: bool) -> Result<(), StorageError>;

    /// Remove a submission.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the submission does not exist.
    async fn delete_assignment(&self, id: AssignmentId) -> Result<(), StorageError>;
}

#[derive(Default)]
struct AssignmentTable {
    next_id: u64,
    rows: Vec<Assignment>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    lessons: Arc<Mutex<HashMap<CourseId, Vec<Lesson>>>>,
    assignments: Arc<Mutex<AssignmentTable>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lesson_title(&self, lesson_id: LessonId) -> Result<Option<String>, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .flatten()
            .find(|lesson| lesson.id() == lesson_id)
            .map(|lesson| lesson.title().to_owned()))
    }

    fn course_title(&self, course_id: CourseId) -> Result<Option<String>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        Ok(guard.get(&course_id).map(|course| course.title().to_owned()))
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ContentStore for InMemoryRepository {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        let mut lessons = guard.get(&course_id).cloned().unwrap_or_default();
        lessons.sort_by_key(lesson_order_key);
        Ok(lessons)
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        let mut courses: Vec<Course> = guard.values().cloned().collect();
        courses.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        courses.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(courses)
    }
}

#[async_trait]
impl CourseWriter for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(poisoned)?;
        guard.insert(course.id(), course.clone());
        Ok(())
    }

    async fn replace_lessons(
        &self,
        course_id: CourseId,
        lessons: &[Lesson],
    ) -> Result<(), StorageError> {
        if lessons.iter().any(|lesson| lesson.course_id() != course_id) {
            return Err(StorageError::Conflict);
        }
        let mut guard = self.lessons.lock().map_err(poisoned)?;
        guard.insert(course_id, lessons.to_vec());
        Ok(())
    }
}

#[async_trait]
impl AssignmentStore for InMemoryRepository {
    async fn approvals(
        &self,
        lesson_id: LessonId,
        learner: &LearnerName,
    ) -> Result<Vec<ApprovalRecord>, StorageError> {
        let guard = self.assignments.lock().map_err(poisoned)?;
        Ok(guard
            .rows
            .iter()
            .filter(|a| a.lesson_id() == lesson_id && a.learner() == learner)
            .map(Assignment::approval_record)
            .collect())
    }

    async fn create_assignment(&self, draft: NewAssignment) -> Result<Assignment, StorageError> {
        let mut guard = self.assignments.lock().map_err(poisoned)?;
        guard.next_id += 1;
        let assignment = draft.into_assignment(AssignmentId::new(guard.next_id));
        guard.rows.push(assignment.clone());
        Ok(assignment)
    }

    async fn list_assignments(&self, limit: u32) -> Result<Vec<AssignmentListing>, StorageError> {
        let mut rows = {
            let guard = self.assignments.lock().map_err(poisoned)?;
            guard.rows.clone()
        };
        rows.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        let mut listings = Vec::with_capacity(rows.len());
        for assignment in rows {
            listings.push(AssignmentListing {
                lesson_title: self.lesson_title(assignment.lesson_id())?,
                course_title: self.course_title(assignment.course_id())?,
                assignment,
            });
        }
        Ok(listings)
    }

    async fn set_approved(&self, id: AssignmentId, approved: bool) -> Result<(), StorageError> {
        let mut guard = self.assignments.lock().map_err(poisoned)?;
        let row = guard
            .rows
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or(StorageError::NotFound)?;
        row.set_approved(approved);
        Ok(())
    }

    async fn delete_assignment(&self, id: AssignmentId) -> Result<(), StorageError> {
        let mut guard = self.assignments.lock().map_err(poisoned)?;
        let before = guard.rows.len();
        guard.rows.retain(|a| a.id() != id);
        if guard.rows.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

/// Aggregates the content and assignment stores behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub content: Arc<dyn ContentStore>,
    pub courses: Arc<dyn CourseWriter>,
    pub assignments: Arc<dyn AssignmentStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let content: Arc<dyn ContentStore> = Arc::new(repo.clone());
        let courses: Arc<dyn CourseWriter> = Arc::new(repo.clone());
        let assignments: Arc<dyn AssignmentStore> = Arc::new(repo);
        Self {
            content,
            courses,
            assignments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use course_core::model::SubmissionContent;
    use course_core::time::fixed_now;

    fn build_course(id: u64) -> Course {
        Course::new(CourseId::new(id), format!("Course {id}"), fixed_now()).unwrap()
    }

    fn build_lesson(id: u64, course_id: u64, minutes: i64) -> Lesson {
        Lesson::new(
            LessonId::new(id),
            CourseId::new(course_id),
            format!("Lesson {id}"),
            fixed_now() + Duration::minutes(minutes),
        )
        .unwrap()
    }

    fn draft(lesson_id: u64, learner: &str, minutes: i64) -> NewAssignment {
        NewAssignment::new(
            LearnerName::parse(learner).unwrap(),
            LessonId::new(lesson_id),
            CourseId::new(1),
            SubmissionContent::parse("answer").unwrap(),
            fixed_now() + Duration::minutes(minutes),
        )
    }

    #[tokio::test]
    async fn lessons_come_back_in_creation_order() {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&build_course(1)).await.unwrap();
        repo.replace_lessons(
            CourseId::new(1),
            &[
                build_lesson(3, 1, 20),
                build_lesson(1, 1, 0),
                build_lesson(2, 1, 10),
            ],
        )
        .await
        .unwrap();

        let ids: Vec<LessonId> = repo
            .list_lessons(CourseId::new(1))
            .await
            .unwrap()
            .iter()
            .map(Lesson::id)
            .collect();
        assert_eq!(ids, vec![LessonId::new(1), LessonId::new(2), LessonId::new(3)]);
        assert!(repo.list_lessons(CourseId::new(9)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_lessons_rejects_foreign_lessons() {
        let repo = InMemoryRepository::new();
        let err = repo
            .replace_lessons(CourseId::new(1), &[build_lesson(1, 2, 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn approval_follows_policy_across_duplicates() {
        let repo = InMemoryRepository::new();
        let first = repo.create_assignment(draft(1, "alice", 0)).await.unwrap();
        repo.create_assignment(draft(1, "alice", 5)).await.unwrap();
        repo.set_approved(first.id(), true).await.unwrap();

        let alice = LearnerName::parse("alice").unwrap();
        let any = repo
            .get_approval(LessonId::new(1), &alice, ApprovalPolicy::AnyApproved)
            .await
            .unwrap();
        let latest = repo
            .get_approval(LessonId::new(1), &alice, ApprovalPolicy::MostRecent)
            .await
            .unwrap();
        assert_eq!(any, Some(Approval { approved: true }));
        assert_eq!(latest, Some(Approval { approved: false }));

        let bob = LearnerName::parse("bob").unwrap();
        let none = repo
            .get_approval(LessonId::new(1), &bob, ApprovalPolicy::AnyApproved)
            .await
            .unwrap();
        assert_eq!(none, None);
    }

    #[tokio::test]
    async fn listing_is_newest_first_with_titles() {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&build_course(1)).await.unwrap();
        repo.replace_lessons(CourseId::new(1), &[build_lesson(1, 1, 0)])
            .await
            .unwrap();
        repo.create_assignment(draft(1, "alice", 0)).await.unwrap();
        repo.create_assignment(draft(7, "bob", 5)).await.unwrap();

        let listed = repo.list_assignments(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].assignment.learner().as_str(), "bob");
        assert_eq!(listed[0].lesson_title, None);
        assert_eq!(listed[1].lesson_title.as_deref(), Some("Lesson 1"));
        assert_eq!(listed[1].course_title.as_deref(), Some("Course 1"));
    }

    #[tokio::test]
    async fn missing_assignment_reports_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .set_approved(AssignmentId::new(42), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        let err = repo
            .delete_assignment(AssignmentId::new(42))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
