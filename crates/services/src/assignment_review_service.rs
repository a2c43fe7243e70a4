use std::sync::Arc;

use tracing::info;

use course_core::model::AssignmentId;
use storage::repository::{AssignmentListing, AssignmentStore};

use crate::context::SessionContext;
use crate::error::AssignmentReviewError;

/// Admin actions over submitted assignments.
///
/// Every call checks the caller's [`SessionContext`]; access rules in the
/// backing store still apply on top of this.
#[derive(Clone)]
pub struct AssignmentReviewService {
    assignments: Arc<dyn AssignmentStore>,
}

impl AssignmentReviewService {
    #[must_use]
    pub fn new(assignments: Arc<dyn AssignmentStore>) -> Self {
        Self { assignments }
    }

    fn require_admin(ctx: &SessionContext) -> Result<(), AssignmentReviewError> {
        if ctx.is_admin() {
            Ok(())
        } else {
            Err(AssignmentReviewError::Forbidden)
        }
    }

    /// Newest submissions first, with lesson and course titles.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` outside an admin session, or `Storage`.
    pub async fn list(
        &self,
        ctx: &SessionContext,
        limit: u32,
    ) -> Result<Vec<AssignmentListing>, AssignmentReviewError> {
        Self::require_admin(ctx)?;
        let listings = self.assignments.list_assignments(limit).await?;
        Ok(listings)
    }

    /// Mark a submission approved, unlocking the next lesson for its learner.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` outside an admin session, or `Storage` (including
    /// `NotFound` for an unknown id).
    pub async fn approve(
        &self,
        ctx: &SessionContext,
        id: AssignmentId,
    ) -> Result<(), AssignmentReviewError> {
        Self::require_admin(ctx)?;
        self.assignments.set_approved(id, true).await?;
        info!(assignment_id = %id, "assignment approved");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Forbidden` outside an admin session, or `Storage`.
    pub async fn delete(
        &self,
        ctx: &SessionContext,
        id: AssignmentId,
    ) -> Result<(), AssignmentReviewError> {
        Self::require_admin(ctx)?;
        self.assignments.delete_assignment(id).await?;
        info!(assignment_id = %id, "assignment deleted");
        Ok(())
    }
}
