//! Course sessions: lesson cursor, approval gate, assignment submission.

mod controller;
mod guard;
mod state;

use std::sync::Arc;

use course_core::Clock;
use course_core::model::{ApprovalPolicy, CourseId};
use storage::repository::{AssignmentStore, ContentStore};

use crate::error::ProgressionError;

pub use controller::LessonProgression;
pub use state::{CursorPosition, LessonProgress, LoadFailure, OutlineItem, SessionStatus};

/// Builds course sessions sharing one set of stores, clock and approval policy.
#[derive(Clone)]
pub struct LessonProgressionService {
    clock: Clock,
    policy: ApprovalPolicy,
    content: Arc<dyn ContentStore>,
    assignments: Arc<dyn AssignmentStore>,
}

impl LessonProgressionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        content: Arc<dyn ContentStore>,
        assignments: Arc<dyn AssignmentStore>,
    ) -> Self {
        Self {
            clock,
            policy: ApprovalPolicy::default(),
            content,
            assignments,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// A session that has not loaded a course yet.
    #[must_use]
    pub fn session(&self) -> LessonProgression {
        LessonProgression::new(Arc::clone(&self.content), Arc::clone(&self.assignments))
            .with_clock(self.clock)
            .with_policy(self.policy)
    }

    /// Open a session on `course_id`.
    ///
    /// # Errors
    ///
    /// Returns the load error from [`LessonProgression::open`].
    pub async fn start(&self, course_id: CourseId) -> Result<LessonProgression, ProgressionError> {
        let session = self.session();
        session.open(course_id).await?;
        Ok(session)
    }
}
