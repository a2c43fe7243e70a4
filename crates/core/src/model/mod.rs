mod assignment;
mod course;
mod ids;
mod lesson;

pub use ids::{AssignmentId, CourseId, LessonId, ParseIdError};

pub use assignment::{
    Approval, ApprovalPolicy, ApprovalRecord, Assignment, AssignmentError, LearnerName,
    NewAssignment, SubmissionContent,
};
pub use course::{Course, CourseError, UNTITLED_COURSE};
pub use lesson::{Lesson, LessonError, UNTITLED_LESSON, lesson_order_key};
