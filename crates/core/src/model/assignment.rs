use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{AssignmentId, CourseId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssignmentError {
    #[error("learner name cannot be empty")]
    EmptyLearner,

    #[error("assignment content cannot be empty")]
    EmptyContent,
}

//
// ─── VALIDATED INPUT ───────────────────────────────────────────────────────────
//

/// Free-text learner name typed in by the learner.
///
/// This is not a verified identity; it only keys assignment lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LearnerName(String);

impl LearnerName {
    /// # Errors
    ///
    /// Returns `AssignmentError::EmptyLearner` for blank input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, AssignmentError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AssignmentError::EmptyLearner);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LearnerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LearnerName {
    type Err = AssignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LearnerName {
    type Error = AssignmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<LearnerName> for String {
    fn from(value: LearnerName) -> Self {
        value.0
    }
}

/// Body of a learner's submission. Kept verbatim once validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionContent(String);

impl SubmissionContent {
    /// # Errors
    ///
    /// Returns `AssignmentError::EmptyContent` for blank input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, AssignmentError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(AssignmentError::EmptyContent);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

//
// ─── ASSIGNMENT ────────────────────────────────────────────────────────────────
//

/// A submission that has not been stored yet.
///
/// Always starts unapproved; approval is granted later by a reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub learner: LearnerName,
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub content: SubmissionContent,
    pub created_at: DateTime<Utc>,
}

impl NewAssignment {
    #[must_use]
    pub fn new(
        learner: LearnerName,
        lesson_id: LessonId,
        course_id: CourseId,
        content: SubmissionContent,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            learner,
            lesson_id,
            course_id,
            content,
            created_at,
        }
    }

    /// Attach the identifier assigned by the store.
    #[must_use]
    pub fn into_assignment(self, id: AssignmentId) -> Assignment {
        Assignment {
            id,
            learner: self.learner,
            lesson_id: self.lesson_id,
            course_id: self.course_id,
            content: self.content.into_inner(),
            approved: false,
            created_at: self.created_at,
        }
    }
}

/// A stored learner submission for one lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    id: AssignmentId,
    learner: LearnerName,
    lesson_id: LessonId,
    course_id: CourseId,
    content: String,
    approved: bool,
    created_at: DateTime<Utc>,
}

impl Assignment {
    /// Rehydrate an assignment read back from storage.
    #[must_use]
    pub fn from_persisted(
        id: AssignmentId,
        learner: LearnerName,
        lesson_id: LessonId,
        course_id: CourseId,
        content: String,
        approved: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            learner,
            lesson_id,
            course_id,
            content,
            approved,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> AssignmentId {
        self.id
    }

    #[must_use]
    pub fn learner(&self) -> &LearnerName {
        &self.learner
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.approved
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_approved(&mut self, approved: bool) {
        self.approved = approved;
    }

    #[must_use]
    pub fn approval_record(&self) -> ApprovalRecord {
        ApprovalRecord {
            id: self.id,
            approved: self.approved,
            created_at: self.created_at,
        }
    }
}

//
// ─── APPROVAL ──────────────────────────────────────────────────────────────────
//

/// Approval state of one stored submission, as seen by the progression gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalRecord {
    pub id: AssignmentId,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Resolved approval for a (lesson, learner) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Approval {
    pub approved: bool,
}

/// How to resolve approval when a learner submitted more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Approved if any submission was approved.
    #[default]
    AnyApproved,
    /// Only the newest submission counts.
    MostRecent,
}

impl ApprovalPolicy {
    /// Resolve a set of submissions into a single approval.
    ///
    /// Returns `None` when there are no submissions at all.
    #[must_use]
    pub fn resolve(self, records: &[ApprovalRecord]) -> Option<Approval> {
        match self {
            ApprovalPolicy::AnyApproved => {
                if records.is_empty() {
                    None
                } else {
                    Some(Approval {
                        approved: records.iter().any(|r| r.approved),
                    })
                }
            }
            ApprovalPolicy::MostRecent => records
                .iter()
                .max_by_key(|r| (r.created_at, r.id))
                .map(|r| Approval {
                    approved: r.approved,
                }),
        }
    }
}

impl FromStr for ApprovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "any_approved" => Ok(Self::AnyApproved),
            "latest" | "most_recent" => Ok(Self::MostRecent),
            other => Err(format!("unknown approval policy: {other}")),
        }
    }
}
