#![forbid(unsafe_code)]

pub mod app_services;
pub mod assignment_review_service;
pub mod catalog_service;
pub mod context;
pub mod error;
pub mod progression;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use assignment_review_service::AssignmentReviewService;
pub use catalog_service::CourseCatalogService;
pub use context::{AuthCheck, SessionContext, StaticAuthCheck};
pub use error::{
    AppServicesError, AssignmentReviewError, CatalogError, ErrorKind, Operation, ProgressionError,
};
pub use progression::{
    CursorPosition, LessonProgress, LessonProgression, LessonProgressionService, LoadFailure,
    OutlineItem, SessionStatus,
};
