use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::model::ids::{CourseId, LessonId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,
}

/// Title shown for stored lessons whose title is blank.
pub const UNTITLED_LESSON: &str = "Untitled lesson";

/// One unit of course content.
///
/// Lessons carry no explicit position: a course orders its lessons by
/// `created_at` ascending, with the lesson id breaking ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    course_id: CourseId,
    title: String,
    description: String,
    content: String,
    video_url: Option<String>,
    assignment: Option<String>,
    created_at: DateTime<Utc>,
}

impl Lesson {
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` if the title is blank.
    pub fn new(
        id: LessonId,
        course_id: CourseId,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        Ok(Self {
            id,
            course_id,
            title,
            description: String::new(),
            content: String::new(),
            video_url: None,
            assignment: None,
            created_at,
        })
    }

    /// Rebuild a lesson read back from storage.
    ///
    /// Stored rows are never rejected: a blank title is shown as
    /// [`UNTITLED_LESSON`].
    #[must_use]
    pub fn from_persisted(
        id: LessonId,
        course_id: CourseId,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            UNTITLED_LESSON.to_owned()
        } else {
            title
        };
        Self {
            id,
            course_id,
            title,
            description: String::new(),
            content: String::new(),
            video_url: None,
            assignment: None,
            created_at,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Attach a video reference as typed by the author. Blank input clears it.
    #[must_use]
    pub fn with_video_url(mut self, raw: Option<String>) -> Self {
        self.video_url = raw
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty());
        self
    }

    /// Attach an assignment prompt. Blank prompts are treated as absent.
    #[must_use]
    pub fn with_assignment(mut self, prompt: Option<String>) -> Self {
        self.assignment = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    #[must_use]
    pub fn assignment(&self) -> Option<&str> {
        self.assignment.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Player URL for the lesson video.
    ///
    /// Only `watch?v=` style links can be embedded; they are rewritten to the
    /// `embed/` path. A missing scheme is read as `https`. Anything else
    /// yields `None`.
    #[must_use]
    pub fn embed_url(&self) -> Option<Url> {
        let raw = self.video_url.as_deref()?;
        if !raw.contains("watch?v=") {
            return None;
        }
        let rewritten = raw.replacen("watch?v=", "embed/", 1);
        Url::parse(&rewritten)
            .or_else(|_| Url::parse(&format!("https://{rewritten}")))
            .ok()
    }
}

/// Sort key that fixes the unlock order of a course.
#[must_use]
pub fn lesson_order_key(lesson: &Lesson) -> (DateTime<Utc>, LessonId) {
    (lesson.created_at(), lesson.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn lesson(id: u64) -> Lesson {
        Lesson::new(LessonId::new(id), CourseId::new(1), format!("L{id}"), fixed_now()).unwrap()
    }

    #[test]
    fn rejects_blank_title() {
        let err = Lesson::new(LessonId::new(1), CourseId::new(1), "", fixed_now()).unwrap_err();
        assert_eq!(err, LessonError::EmptyTitle);
    }

    #[test]
    fn watch_links_become_embed_links() {
        let lesson = lesson(1).with_video_url(Some("https://www.youtube.com/watch?v=abc123".into()));
        assert_eq!(
            lesson.embed_url().unwrap().as_str(),
            "https://www.youtube.com/embed/abc123"
        );
    }

    #[test]
    fn other_links_have_no_embed() {
        let lesson = lesson(1).with_video_url(Some("https://vimeo.com/12345".into()));
        assert_eq!(lesson.video_url(), Some("https://vimeo.com/12345"));
        assert!(lesson.embed_url().is_none());
    }

    #[test]
    fn blank_video_and_assignment_are_absent() {
        let lesson = lesson(1)
            .with_video_url(Some("  ".into()))
            .with_assignment(Some(" ".into()));
        assert!(lesson.video_url().is_none());
        assert!(lesson.assignment().is_none());
    }

    #[test]
    fn free_text_video_is_kept_and_embedded_when_possible() {
        let bare = lesson(1).with_video_url(Some(" youtube.com/watch?v=abc ".into()));
        assert_eq!(bare.video_url(), Some("youtube.com/watch?v=abc"));
        assert_eq!(
            bare.embed_url().unwrap().as_str(),
            "https://youtube.com/embed/abc"
        );

        let junk = lesson(2).with_video_url(Some("see the slides".into()));
        assert_eq!(junk.video_url(), Some("see the slides"));
        assert!(junk.embed_url().is_none());
    }

    #[test]
    fn persisted_blank_title_gets_placeholder() {
        let lesson = Lesson::from_persisted(LessonId::new(4), CourseId::new(1), " ", fixed_now());
        assert_eq!(lesson.title(), UNTITLED_LESSON);
    }

    #[test]
    fn order_key_breaks_timestamp_ties_by_id() {
        let later = Lesson::new(
            LessonId::new(1),
            CourseId::new(1),
            "late",
            fixed_now() + Duration::minutes(1),
        )
        .unwrap();
        let mut lessons = vec![later, lesson(3), lesson(2)];
        lessons.sort_by_key(lesson_order_key);
        let ids: Vec<LessonId> = lessons.iter().map(Lesson::id).collect();
        assert_eq!(ids, vec![LessonId::new(2), LessonId::new(3), LessonId::new(1)]);
    }
}
