use thiserror::Error;

use crate::model::{AssignmentError, CourseError, LessonError};

/// Any domain validation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}
