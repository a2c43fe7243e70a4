//! Thin client for a hosted PostgREST-style backend.
//!
//! Tables are reached at `<base>/rest/v1/<table>`; filters use the
//! `column=eq.value` convention and every request carries the project key.

use std::sync::Arc;

use async_trait::async_trait;
use course_core::model::{
    ApprovalRecord, Assignment, AssignmentId, Course, CourseId, LearnerName, Lesson, LessonId,
    NewAssignment,
};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::repository::{
    AssignmentListing, AssignmentStore, ContentStore, CourseWriter, Storage, StorageError,
};

mod rows;

use rows::{ApprovalRow, AssignmentRow, CourseRow, LessonRow, NewAssignmentRow};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RestConfigError {
    #[error("backend url is invalid: {0}")]
    InvalidUrl(String),
    #[error("backend api key is missing")]
    MissingKey,
    #[error("backend api key contains invalid header characters")]
    InvalidKey,
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

#[derive(Clone, Debug)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RestConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Clone, Debug)]
pub struct RestRepository {
    client: Client,
    config: RestConfig,
}

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

impl RestRepository {
    /// Build a client with the project key attached to every request.
    ///
    /// # Errors
    ///
    /// Returns `RestConfigError` if the URL or key is unusable.
    pub fn new(config: RestConfig) -> Result<Self, RestConfigError> {
        let parsed = reqwest::Url::parse(&config.base_url)
            .map_err(|e| RestConfigError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RestConfigError::InvalidUrl(config.base_url.clone()));
        }
        if config.api_key.trim().is_empty() {
            return Err(RestConfigError::MissingKey);
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key).map_err(|_| RestConfigError::InvalidKey)?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| RestConfigError::InvalidKey)?;
        headers.insert("apikey", key);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self { client, config })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client.request(method, self.config.table_url(table))
    }

    async fn send(builder: RequestBuilder) -> Result<Response, StorageError> {
        let response = builder.send().await.map_err(conn)?;
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound),
            StatusCode::CONFLICT => Err(StorageError::Conflict),
            status => {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(%status, body = %body, "backend request failed");
                Err(StorageError::Connection(format!("backend returned {status}")))
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(builder: RequestBuilder) -> Result<Vec<T>, StorageError> {
        let response = Self::send(builder).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl ContentStore for RestRepository {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let rows: Vec<CourseRow> = Self::fetch(
            self.request(Method::GET, "courses")
                .query(&[("select", "*".to_owned()), ("id", eq(id))]),
        )
        .await?;
        Ok(rows.into_iter().next().map(CourseRow::into_course))
    }

    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let rows: Vec<LessonRow> = Self::fetch(self.request(Method::GET, "lessons").query(&[
            ("select", "*".to_owned()),
            ("course_id", eq(course_id)),
            ("order", "created_at.asc,id.asc".to_owned()),
        ]))
        .await?;
        Ok(rows.into_iter().map(LessonRow::into_lesson).collect())
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let rows: Vec<CourseRow> = Self::fetch(self.request(Method::GET, "courses").query(&[
            ("select", "*".to_owned()),
            ("order", "created_at.desc,id.desc".to_owned()),
            ("limit", limit.to_string()),
        ]))
        .await?;
        Ok(rows.into_iter().map(CourseRow::into_course).collect())
    }
}

#[async_trait]
impl CourseWriter for RestRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        Self::send(
            self.request(Method::POST, "courses")
                .header("Prefer", "resolution=merge-duplicates")
                .json(&[CourseRow::from_course(course)]),
        )
        .await?;
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

        let mut delete = self
            .request(Method::DELETE, "lessons")
            .query(&[("course_id", eq(course_id))]);
        if !lessons.is_empty() {
            let keep: Vec<String> = lessons.iter().map(|l| l.id().to_string()).collect();
            delete = delete.query(&[("id", format!("not.in.({})", keep.join(",")))]);
        }
        Self::send(delete).await?;

        if lessons.is_empty() {
            return Ok(());
        }
        let rows: Vec<LessonRow> = lessons.iter().map(LessonRow::from_lesson).collect();
        Self::send(
            self.request(Method::POST, "lessons")
                .header("Prefer", "resolution=merge-duplicates")
                .json(&rows),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AssignmentStore for RestRepository {
    async fn approvals(
        &self,
        lesson_id: LessonId,
        learner: &LearnerName,
    ) -> Result<Vec<ApprovalRecord>, StorageError> {
        let rows: Vec<ApprovalRow> = Self::fetch(self.request(Method::GET, "assignments").query(&[
            ("select", "id,approved,created_at".to_owned()),
            ("lesson_id", eq(lesson_id)),
            ("username", eq(learner)),
        ]))
        .await?;
        Ok(rows.into_iter().map(ApprovalRecord::from).collect())
    }

    async fn create_assignment(&self, draft: NewAssignment) -> Result<Assignment, StorageError> {
        let rows: Vec<AssignmentRow> = Self::fetch(
            self.request(Method::POST, "assignments")
                .header("Prefer", "return=representation")
                .json(&[NewAssignmentRow::from_draft(&draft)]),
        )
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::Serialization("insert returned no rows".into()))?
            .into_assignment()
    }

    async fn list_assignments(&self, limit: u32) -> Result<Vec<AssignmentListing>, StorageError> {
        let rows: Vec<AssignmentRow> = Self::fetch(self.request(Method::GET, "assignments").query(&[
            ("select", "*,lessons(title),courses(title)".to_owned()),
            ("order", "created_at.desc,id.desc".to_owned()),
            ("limit", limit.to_string()),
        ]))
        .await?;
        rows.into_iter().map(AssignmentRow::into_listing).collect()
    }

    async fn set_approved(&self, id: AssignmentId, approved: bool) -> Result<(), StorageError> {
        let rows: Vec<ApprovalRow> = Self::fetch(
            self.request(Method::PATCH, "assignments")
                .query(&[("id", eq(id)), ("select", "id,approved,created_at".to_owned())])
                .header("Prefer", "return=representation")
                .json(&serde_json::json!({ "approved": approved })),
        )
        .await?;
        if rows.is_empty() {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_assignment(&self, id: AssignmentId) -> Result<(), StorageError> {
        let rows: Vec<ApprovalRow> = Self::fetch(
            self.request(Method::DELETE, "assignments")
                .query(&[("id", eq(id)), ("select", "id,approved,created_at".to_owned())])
                .header("Prefer", "return=representation"),
        )
        .await?;
        if rows.is_empty() {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

impl Storage {
    /// Build a `Storage` backed by the hosted REST backend.
    ///
    /// # Errors
    ///
    /// Returns `RestConfigError` if the client cannot be configured.
    pub fn rest(config: RestConfig) -> Result<Self, RestConfigError> {
        let repo = RestRepository::new(config)?;
        let content: Arc<dyn ContentStore> = Arc::new(repo.clone());
        let courses: Arc<dyn CourseWriter> = Arc::new(repo.clone());
        let assignments: Arc<dyn AssignmentStore> = Arc::new(repo);
        Ok(Self {
            content,
            courses,
            assignments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_url_ignores_trailing_slash() {
        let config = RestConfig::new("https://example.supabase.co/", "key");
        assert_eq!(
            config.table_url("lessons"),
            "https://example.supabase.co/rest/v1/lessons"
        );
    }

    #[test]
    fn rejects_missing_key() {
        let err = RestRepository::new(RestConfig::new("https://example.com", "  ")).unwrap_err();
        assert!(matches!(err, RestConfigError::MissingKey));
    }

    #[test]
    fn rejects_non_http_url() {
        let err = RestRepository::new(RestConfig::new("ftp://example.com", "key")).unwrap_err();
        assert!(matches!(err, RestConfigError::InvalidUrl(_)));
        let err = RestRepository::new(RestConfig::new("not a url", "key")).unwrap_err();
        assert!(matches!(err, RestConfigError::InvalidUrl(_)));
    }

    #[test]
    fn eq_filter_formats_values() {
        assert_eq!(eq(LessonId::new(4)), "eq.4");
        let uuid_id: CourseId = "3f1c2a9e-6b7d-4e21-9a0c-1d2e3f4a5b6c".parse().unwrap();
        assert_eq!(eq(uuid_id), "eq.3f1c2a9e-6b7d-4e21-9a0c-1d2e3f4a5b6c");
        assert_eq!(eq(LearnerName::parse("alice").unwrap()), "eq.alice");
    }

    #[test]
    fn builds_storage_from_valid_config() {
        assert!(Storage::rest(RestConfig::new("https://example.com", "key")).is_ok());
    }
}
