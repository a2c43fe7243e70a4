use std::sync::Arc;

use course_core::model::ApprovalPolicy;
use storage::repository::Storage;
use storage::rest::RestConfig;

use crate::Clock;
use crate::assignment_review_service::AssignmentReviewService;
use crate::catalog_service::CourseCatalogService;
use crate::error::AppServicesError;
use crate::progression::LessonProgressionService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    progression: Arc<LessonProgressionService>,
    catalog: Arc<CourseCatalogService>,
    review: Arc<AssignmentReviewService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if connecting or migrating fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        policy: ApprovalPolicy,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, policy))
    }

    /// Build services backed by the hosted REST backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the backend URL or key is unusable.
    pub fn new_rest(
        config: RestConfig,
        clock: Clock,
        policy: ApprovalPolicy,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::rest(config)?;
        Ok(Self::from_storage(&storage, clock, policy))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, policy: ApprovalPolicy) -> Self {
        let progression = Arc::new(
            LessonProgressionService::new(
                clock,
                Arc::clone(&storage.content),
                Arc::clone(&storage.assignments),
            )
            .with_policy(policy),
        );
        let catalog = Arc::new(CourseCatalogService::new(Arc::clone(&storage.content)));
        let review = Arc::new(AssignmentReviewService::new(Arc::clone(
            &storage.assignments,
        )));

        Self {
            progression,
            catalog,
            review,
        }
    }

    #[must_use]
    pub fn progression(&self) -> Arc<LessonProgressionService> {
        Arc::clone(&self.progression)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CourseCatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn review(&self) -> Arc<AssignmentReviewService> {
        Arc::clone(&self.review)
    }
}
