use course_core::model::{
    ApprovalRecord, Assignment, AssignmentId, LearnerName, LessonId, NewAssignment,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{assignment_id_from_i64, id_to_i64, map_listing_row, ser};
use crate::repository::{AssignmentListing, AssignmentStore, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl AssignmentStore for SqliteRepository {
    async fn approvals(
        &self,
        lesson_id: LessonId,
        learner: &LearnerName,
    ) -> Result<Vec<ApprovalRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, approved, created_at
            FROM assignments
            WHERE lesson_id = ?1 AND username = ?2
            ",
        )
        .bind(id_to_i64("lesson_id", lesson_id.as_u64())?)
        .bind(learner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| -> Result<ApprovalRecord, StorageError> {
                Ok(ApprovalRecord {
                    id: assignment_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
                    approved: row.try_get::<i64, _>("approved").map_err(ser)? != 0,
                    created_at: row.try_get("created_at").map_err(ser)?,
                })
            })
            .collect()
    }

    async fn create_assignment(&self, draft: NewAssignment) -> Result<Assignment, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO assignments (username, lesson_id, course_id, content, approved, created_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            ",
        )
        .bind(draft.learner.as_str())
        .bind(id_to_i64("lesson_id", draft.lesson_id.as_u64())?)
        .bind(id_to_i64("course_id", draft.course_id.as_u64())?)
        .bind(draft.content.as_str())
        .bind(draft.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = assignment_id_from_i64(res.last_insert_rowid())?;
        Ok(draft.into_assignment(id))
    }

    async fn list_assignments(&self, limit: u32) -> Result<Vec<AssignmentListing>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT a.id, a.username, a.lesson_id, a.course_id, a.content, a.approved, a.created_at,
                   l.title AS lesson_title, c.title AS course_title
            FROM assignments a
            LEFT JOIN lessons l ON l.id = a.lesson_id
            LEFT JOIN courses c ON c.id = a.course_id
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_listing_row).collect()
    }

    async fn set_approved(&self, id: AssignmentId, approved: bool) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE assignments SET approved = ?1 WHERE id = ?2")
            .bind(i64::from(approved))
            .bind(id_to_i64("assignment_id", id.as_u64())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_assignment(&self, id: AssignmentId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM assignments WHERE id = ?1")
            .bind(id_to_i64("assignment_id", id.as_u64())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
