use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::CourseId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,
}

/// Title shown for stored courses whose title is blank.
pub const UNTITLED_COURSE: &str = "Untitled course";

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A named collection of ordered lessons.
///
/// Courses are read-only from the learner's point of view. Optional catalog
/// fields default to empty strings so list views never need to branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: String,
    duration: String,
    category: String,
    level: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Creates a course with the given title.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` if the title is blank.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description: String::new(),
            duration: String::new(),
            category: String::new(),
            level: String::new(),
            image_url: None,
            created_at,
        })
    }

    /// Rebuild a course read back from storage, without rejecting blank titles.
    #[must_use]
    pub fn from_persisted(
        id: CourseId,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        Self::new(id, title, created_at).unwrap_or_else(|_| Self {
            id,
            title: UNTITLED_COURSE.to_owned(),
            description: String::new(),
            duration: String::new(),
            category: String::new(),
            level: String::new(),
            image_url: None,
            created_at,
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = duration.into();
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Blank URLs are treated as absent.
    #[must_use]
    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url.filter(|url| !url.trim().is_empty());
        self
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Free-text duration such as "6 weeks".
    #[must_use]
    pub fn duration(&self) -> &str {
        &self.duration
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn level(&self) -> &str {
        &self.level
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn rejects_blank_title() {
        let err = Course::new(CourseId::new(1), "   ", fixed_now()).unwrap_err();
        assert_eq!(err, CourseError::EmptyTitle);
    }

    #[test]
    fn persisted_blank_title_gets_placeholder() {
        let course = Course::from_persisted(CourseId::new(2), "", fixed_now());
        assert_eq!(course.title(), UNTITLED_COURSE);
        let named = Course::from_persisted(CourseId::new(3), " SQL ", fixed_now());
        assert_eq!(named.title(), "SQL");
    }

    #[test]
    fn builder_fills_catalog_fields() {
        let course = Course::new(CourseId::new(1), " Rust Basics ", fixed_now())
            .unwrap()
            .with_description("Ownership and borrowing")
            .with_duration("4 weeks")
            .with_category("Programming")
            .with_level("Beginner")
            .with_image_url(Some(String::new()));

        assert_eq!(course.title(), "Rust Basics");
        assert_eq!(course.duration(), "4 weeks");
        assert_eq!(course.category(), "Programming");
        assert_eq!(course.level(), "Beginner");
        assert_eq!(course.image_url(), None);
    }
}
