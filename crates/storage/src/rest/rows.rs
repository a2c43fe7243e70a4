//! Wire shapes of the hosted backend's tables.

use chrono::{DateTime, Utc};
use course_core::model::{
    ApprovalRecord, Assignment, AssignmentId, Course, CourseId, LearnerName, Lesson, LessonId,
    NewAssignment,
};
use serde::{Deserialize, Serialize};

use crate::repository::{AssignmentListing, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CourseRow {
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CourseRow {
    pub(crate) fn from_course(course: &Course) -> Self {
        Self {
            id: course.id(),
            title: course.title().to_owned(),
            description: Some(course.description().to_owned()),
            duration: Some(course.duration().to_owned()),
            category: Some(course.category().to_owned()),
            level: Some(course.level().to_owned()),
            image_url: course.image_url().map(str::to_owned),
            created_at: course.created_at(),
        }
    }

    pub(crate) fn into_course(self) -> Course {
        Course::from_persisted(self.id, self.title, self.created_at)
            .with_description(self.description.unwrap_or_default())
            .with_duration(self.duration.unwrap_or_default())
            .with_category(self.category.unwrap_or_default())
            .with_level(self.level.unwrap_or_default())
            .with_image_url(self.image_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LessonRow {
    pub id: LessonId,
    pub course_id: CourseId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub assignment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LessonRow {
    pub(crate) fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id(),
            course_id: lesson.course_id(),
            title: lesson.title().to_owned(),
            description: Some(lesson.description().to_owned()),
            content: Some(lesson.content().to_owned()),
            video_url: lesson.video_url().map(str::to_owned),
            assignment: lesson.assignment().map(str::to_owned),
            created_at: lesson.created_at(),
        }
    }

    pub(crate) fn into_lesson(self) -> Lesson {
        Lesson::from_persisted(self.id, self.course_id, self.title, self.created_at)
            .with_description(self.description.unwrap_or_default())
            .with_content(self.content.unwrap_or_default())
            .with_assignment(self.assignment)
            .with_video_url(self.video_url)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApprovalRow {
    pub id: AssignmentId,
    #[serde(default)]
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ApprovalRow> for ApprovalRecord {
    fn from(row: ApprovalRow) -> Self {
        ApprovalRecord {
            id: row.id,
            approved: row.approved,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewAssignmentRow<'a> {
    pub username: &'a str,
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub content: &'a str,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewAssignmentRow<'a> {
    pub(crate) fn from_draft(draft: &'a NewAssignment) -> Self {
        Self {
            username: draft.learner.as_str(),
            lesson_id: draft.lesson_id,
            course_id: draft.course_id,
            content: draft.content.as_str(),
            approved: false,
            created_at: draft.created_at,
        }
    }
}

/// Title of an embedded related row (`lessons(title)`).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TitleRow {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AssignmentRow {
    pub id: AssignmentId,
    pub username: String,
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub content: String,
    #[serde(default)]
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub lessons: Option<TitleRow>,
    #[serde(default)]
    pub courses: Option<TitleRow>,
}

impl AssignmentRow {
    pub(crate) fn into_assignment(self) -> Result<Assignment, StorageError> {
        Ok(self.into_listing()?.assignment)
    }

    pub(crate) fn into_listing(self) -> Result<AssignmentListing, StorageError> {
        let learner = LearnerName::parse(self.username).map_err(ser)?;
        Ok(AssignmentListing {
            assignment: Assignment::from_persisted(
                self.id,
                learner,
                self.lesson_id,
                self.course_id,
                self.content,
                self.approved,
                self.created_at,
            ),
            lesson_title: self.lessons.map(|l| l.title),
            course_title: self.courses.map(|c| c.title),
        })
    }
}
