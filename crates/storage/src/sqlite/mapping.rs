use course_core::model::{
    Assignment, AssignmentId, Course, CourseId, LearnerName, Lesson, LessonId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{AssignmentListing, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

/// SQLite keys are integers; UUID ids from the hosted backend have no row here.
pub(crate) fn id_to_i64(field: &'static str, v: Option<u64>) -> Result<i64, StorageError> {
    let v = v.ok_or_else(|| StorageError::Serialization(format!("{field} is not a numeric key")))?;
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn assignment_id_from_i64(v: i64) -> Result<AssignmentId, StorageError> {
    Ok(AssignmentId::new(i64_to_u64("assignment_id", v)?))
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    let course = Course::from_persisted(
        course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    );

    Ok(course
        .with_description(row.try_get::<String, _>("description").map_err(ser)?)
        .with_duration(row.try_get::<String, _>("duration").map_err(ser)?)
        .with_category(row.try_get::<String, _>("category").map_err(ser)?)
        .with_level(row.try_get::<String, _>("level").map_err(ser)?)
        .with_image_url(row.try_get::<Option<String>, _>("image_url").map_err(ser)?))
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Ok(Lesson::from_persisted(
        lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .with_description(row.try_get::<String, _>("description").map_err(ser)?)
    .with_content(row.try_get::<String, _>("content").map_err(ser)?)
    .with_assignment(row.try_get::<Option<String>, _>("assignment").map_err(ser)?)
    .with_video_url(row.try_get::<Option<String>, _>("video_url").map_err(ser)?))
}

pub(crate) fn map_assignment_row(row: &SqliteRow) -> Result<Assignment, StorageError> {
    let learner = LearnerName::parse(row.try_get::<String, _>("username").map_err(ser)?)
        .map_err(ser)?;
    Ok(Assignment::from_persisted(
        assignment_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        learner,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get::<String, _>("content").map_err(ser)?,
        row.try_get::<i64, _>("approved").map_err(ser)? != 0,
        row.try_get("created_at").map_err(ser)?,
    ))
}

pub(crate) fn map_listing_row(row: &SqliteRow) -> Result<AssignmentListing, StorageError> {
    Ok(AssignmentListing {
        assignment: map_assignment_row(row)?,
        lesson_title: row.try_get("lesson_title").map_err(ser)?,
        course_title: row.try_get("course_title").map_err(ser)?,
    })
}
