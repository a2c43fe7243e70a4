use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

/// Storage key behind every id: a local sequence number, or the UUID primary
/// key used by the hosted backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
enum Key {
    Seq(u64),
    Uuid(Uuid),
}

impl Key {
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u64>() {
            return Some(Key::Seq(n));
        }
        Uuid::parse_str(s).ok().map(Key::Uuid)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Seq(n) => write!(f, "{n}"),
            Key::Uuid(u) => write!(f, "{}", u.hyphenated()),
        }
    }
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Key);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(Key::Seq(id))
            }

            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(Key::Uuid(id))
            }

            /// The sequence number, if this id is not a UUID.
            #[must_use]
            pub const fn as_u64(&self) -> Option<u64> {
                match self.0 {
                    Key::Seq(n) => Some(n),
                    Key::Uuid(_) => None,
                }
            }

            #[must_use]
            pub const fn as_uuid(&self) -> Option<Uuid> {
                match self.0 {
                    Key::Uuid(u) => Some(u),
                    Key::Seq(_) => None,
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Key::parse(s).map(Self).ok_or(ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

record_id!(
    /// Unique identifier for a Course
    CourseId
);
record_id!(
    /// Unique identifier for a Lesson
    LessonId
);
record_id!(
    /// Unique identifier for a submitted Assignment
    AssignmentId
);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_UUID: &str = "3f1c2a9e-6b7d-4e21-9a0c-1d2e3f4a5b6c";

    #[test]
    fn course_id_display() {
        assert_eq!(CourseId::new(42).to_string(), "42");
    }

    #[test]
    fn lesson_id_from_str_trims_input() {
        let id: LessonId = " 7 ".parse().unwrap();
        assert_eq!(id, LessonId::new(7));
        assert_eq!(id.as_u64(), Some(7));
    }

    #[test]
    fn assignment_id_from_str_invalid() {
        let err = "abc".parse::<AssignmentId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse AssignmentId from string");
    }

    #[test]
    fn debug_names_the_id_kind() {
        assert_eq!(format!("{:?}", LessonId::new(3)), "LessonId(3)");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&CourseId::new(9)).unwrap();
        assert_eq!(json, "9");
    }

    #[test]
    fn uuid_ids_parse_and_round_trip_as_strings() {
        let id: CourseId = SAMPLE_UUID.parse().unwrap();
        assert_eq!(id.as_u64(), None);
        assert_eq!(id.to_string(), SAMPLE_UUID);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{SAMPLE_UUID}\""));
        let back: CourseId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert_eq!(back, CourseId::from_uuid(Uuid::parse_str(SAMPLE_UUID).unwrap()));
        assert_eq!(back.as_uuid(), Uuid::parse_str(SAMPLE_UUID).ok());
    }

    #[test]
    fn numeric_json_decodes_to_sequence_ids() {
        let id: LessonId = serde_json::from_str("12").unwrap();
        assert_eq!(id, LessonId::new(12));
    }
}
