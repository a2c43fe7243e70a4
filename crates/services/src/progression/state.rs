use serde::Serialize;

/// Why a course session could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum LoadFailure {
    CourseNotFound,
    Store(String),
}

/// Where the cursor sits within a loaded course.
///
/// A single-lesson course reports `Last`: forward movement is what matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorPosition {
    First,
    Middle,
    Last,
}

impl CursorPosition {
    #[must_use]
    pub fn of(cursor: usize, len: usize) -> Self {
        if cursor + 1 >= len {
            CursorPosition::Last
        } else if cursor == 0 {
            CursorPosition::First
        } else {
            CursorPosition::Middle
        }
    }
}

/// Observable state of a course session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Loading,
    Failed { failure: LoadFailure },
    Empty,
    Loaded { cursor: usize, position: CursorPosition },
}

impl SessionStatus {
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, SessionStatus::Loaded { .. })
    }
}

/// "Lesson 2 of 5" header data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonProgress {
    /// 1-based position of the displayed lesson.
    pub position: usize,
    pub total: usize,
    pub is_first: bool,
    pub is_last: bool,
}

/// Sidebar entry for one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineItem {
    pub index: usize,
    pub title: String,
    pub is_current: bool,
    /// Lessons before the cursor render with a check mark.
    pub is_before_cursor: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_cover_edges() {
        assert_eq!(CursorPosition::of(0, 3), CursorPosition::First);
        assert_eq!(CursorPosition::of(1, 3), CursorPosition::Middle);
        assert_eq!(CursorPosition::of(2, 3), CursorPosition::Last);
        assert_eq!(CursorPosition::of(0, 1), CursorPosition::Last);
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_value(SessionStatus::Loaded {
            cursor: 1,
            position: CursorPosition::Middle,
        })
        .unwrap();
        assert_eq!(json["state"], "loaded");
        assert_eq!(json["position"], "middle");
    }
}
