use std::sync::Arc;

use course_core::model::{Course, CourseId};
use storage::repository::ContentStore;

use crate::error::CatalogError;

/// Read access to the course catalog.
#[derive(Clone)]
pub struct CourseCatalogService {
    content: Arc<dyn ContentStore>,
}

impl CourseCatalogService {
    #[must_use]
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self { content }
    }

    /// List courses, newest first, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, CatalogError> {
        let courses = self.content.list_courses(limit).await?;
        Ok(courses)
    }

    /// Fetch a course by ID.
    ///
    /// Returns `Ok(None)` when the course does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn get_course(&self, course_id: CourseId) -> Result<Option<Course>, CatalogError> {
        let course = self.content.get_course(course_id).await?;
        Ok(course)
    }
}
