use std::collections::HashSet;

use course_core::model::{Course, CourseId, Lesson};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_course_row, map_lesson_row};
use crate::repository::{ContentStore, CourseWriter, StorageError};

const COURSE_COLUMNS: &str =
    "id, title, description, duration, category, level, image_url, created_at";

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ContentStore for SqliteRepository {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"))
            .bind(id_to_i64("course_id", id.as_u64())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, description, content, video_url, assignment, created_at
            FROM lessons
            WHERE course_id = ?1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("course_id", course_id.as_u64())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_lesson_row).collect()
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_course_row).collect()
    }
}

#[async_trait::async_trait]
impl CourseWriter for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, description, duration, category, level, image_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                duration = excluded.duration,
                category = excluded.category,
                level = excluded.level,
                image_url = excluded.image_url
            ",
        )
        .bind(id_to_i64("course_id", course.id().as_u64())?)
        .bind(course.title())
        .bind(course.description())
        .bind(course.duration())
        .bind(course.category())
        .bind(course.level())
        .bind(course.image_url())
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    /// Lessons missing from `lessons` are deleted; the rest are upserted in place
    /// so their ids, and the submissions keyed on them, survive an edit.
    async fn replace_lessons(
        &self,
        course_id: CourseId,
        lessons: &[Lesson],
    ) -> Result<(), StorageError> {
        if lessons.iter().any(|lesson| lesson.course_id() != course_id) {
            return Err(StorageError::Conflict);
        }
        let course_key = id_to_i64("course_id", course_id.as_u64())?;
        let keep: HashSet<u64> = lessons.iter().filter_map(|l| l.id().as_u64()).collect();

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let existing: Vec<i64> = sqlx::query_scalar("SELECT id FROM lessons WHERE course_id = ?1")
            .bind(course_key)
            .fetch_all(&mut *tx)
            .await
            .map_err(conn)?;
        for id in existing {
            let stale = u64::try_from(id).map_or(true, |id| !keep.contains(&id));
            if stale {
                sqlx::query("DELETE FROM lessons WHERE id = ?1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(conn)?;
            }
        }

        for lesson in lessons {
            sqlx::query(
                r"
                INSERT INTO lessons (id, course_id, title, description, content, video_url, assignment, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    course_id = excluded.course_id,
                    title = excluded.title,
                    description = excluded.description,
                    content = excluded.content,
                    video_url = excluded.video_url,
                    assignment = excluded.assignment,
                    created_at = excluded.created_at
                ",
            )
            .bind(id_to_i64("lesson_id", lesson.id().as_u64())?)
            .bind(course_key)
            .bind(lesson.title())
            .bind(lesson.description())
            .bind(lesson.content())
            .bind(lesson.video_url())
            .bind(lesson.assignment())
            .bind(lesson.created_at())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
