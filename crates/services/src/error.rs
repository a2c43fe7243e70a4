//! Shared error types for the services crate.

use std::fmt;

use thiserror::Error;

use course_core::model::AssignmentError;
use storage::repository::StorageError;
use storage::rest::RestConfigError;
use storage::sqlite::SqliteInitError;

/// Operations guarded against concurrent duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    Advance,
    Submit,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Open => f.write_str("course load"),
            Operation::Advance => f.write_str("advance"),
            Operation::Submit => f.write_str("submission"),
        }
    }
}

/// Coarse error categories a front end can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; nothing was sent to a store.
    Validation,
    /// Course or lessons absent.
    NotFound,
    /// The progression gate said no. Expected path, not a fault.
    NotApproved,
    /// A move that the current cursor or session state does not allow.
    Navigation,
    /// The same operation is already running.
    Busy,
    /// Underlying store failure.
    Store,
}

/// Errors emitted by `LessonProgression`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressionError {
    #[error(transparent)]
    Validation(#[from] AssignmentError),
    #[error("course not found")]
    CourseNotFound,
    #[error("no lessons available")]
    NoLessons,
    #[error("your assignment for this lesson has not been approved yet")]
    NotApproved,
    #[error("already at the last lesson")]
    AtLastLesson,
    #[error("lesson {index} is out of range ({len} lessons)")]
    OutOfRange { index: usize, len: usize },
    #[error("no course is loaded")]
    NotLoaded,
    #[error("course session was reopened while the request was running")]
    Superseded,
    #[error("{0} already in progress")]
    Busy(Operation),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProgressionError::Validation(_) => ErrorKind::Validation,
            ProgressionError::CourseNotFound | ProgressionError::NoLessons => ErrorKind::NotFound,
            ProgressionError::NotApproved => ErrorKind::NotApproved,
            ProgressionError::AtLastLesson
            | ProgressionError::OutOfRange { .. }
            | ProgressionError::NotLoaded
            | ProgressionError::Superseded => ErrorKind::Navigation,
            ProgressionError::Busy(_) => ErrorKind::Busy,
            ProgressionError::Storage(StorageError::NotFound) => ErrorKind::NotFound,
            ProgressionError::Storage(_) => ErrorKind::Store,
        }
    }
}

/// Errors emitted by `AssignmentReviewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssignmentReviewError {
    #[error("admin session required")]
    Forbidden,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CourseCatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Rest(#[from] RestConfigError),
}
