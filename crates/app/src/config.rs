use std::env;
use std::fmt;

use course_core::model::{ApprovalPolicy, CourseId};

pub const DEFAULT_DB_URL: &str = "sqlite:dev.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Sqlite { db_url: String },
    Rest { url: String, key: String },
}

impl Backend {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Sqlite { .. } => "sqlite",
            Backend::Rest { .. } => "rest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownBackend(String),
    MissingRestSetting(&'static str),
    InvalidCourseId(String),
    InvalidPolicy(String),
    InvalidFlag { name: &'static str, raw: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownBackend(raw) => {
                write!(f, "unknown backend {raw:?} (expected sqlite or rest)")
            }
            ConfigError::MissingRestSetting(name) => {
                write!(f, "{name} must be set for the rest backend")
            }
            ConfigError::InvalidCourseId(raw) => write!(f, "invalid course id: {raw}"),
            ConfigError::InvalidPolicy(message) => f.write_str(message),
            ConfigError::InvalidFlag { name, raw } => {
                write!(f, "{name} must be true or false, got {raw:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings gathered from the environment (and `.env`), before flags apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: Backend,
    pub course_id: Option<CourseId>,
    pub learner: Option<String>,
    pub admin: bool,
    pub policy: ApprovalPolicy,
    pub log_filter: String,
}

impl AppConfig {
    /// Read `COURSE_*` variables, loading `.env` first when present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for values that do not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// # Errors
    ///
    /// Returns `ConfigError` for values that do not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let backend_name = var("COURSE_BACKEND").unwrap_or_else(|| "sqlite".into());
        let backend = parse_backend(
            &backend_name,
            var("COURSE_DB_URL"),
            var("COURSE_REST_URL"),
            var("COURSE_REST_KEY"),
        )?;

        let course_id = var("COURSE_ID")
            .map(|raw| parse_course_id(&raw))
            .transpose()?;
        let admin = var("COURSE_ADMIN")
            .map(|raw| parse_flag("COURSE_ADMIN", &raw))
            .transpose()?
            .unwrap_or(false);
        let policy = var("COURSE_APPROVAL_POLICY")
            .map(|raw| raw.parse::<ApprovalPolicy>().map_err(ConfigError::InvalidPolicy))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            backend,
            course_id,
            learner: var("COURSE_LEARNER"),
            admin,
            policy,
            log_filter: var("RUST_LOG").unwrap_or_else(|| "info".into()),
        })
    }
}

/// # Errors
///
/// Returns `ConfigError` for an unknown backend or missing REST settings.
pub fn parse_backend(
    name: &str,
    db_url: Option<String>,
    rest_url: Option<String>,
    rest_key: Option<String>,
) -> Result<Backend, ConfigError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "sqlite" => Ok(Backend::Sqlite {
            db_url: db_url.unwrap_or_else(|| DEFAULT_DB_URL.into()),
        }),
        "rest" => Ok(Backend::Rest {
            url: rest_url.ok_or(ConfigError::MissingRestSetting("COURSE_REST_URL"))?,
            key: rest_key.ok_or(ConfigError::MissingRestSetting("COURSE_REST_KEY"))?,
        }),
        other => Err(ConfigError::UnknownBackend(other.to_owned())),
    }
}

/// # Errors
///
/// Returns `ConfigError::InvalidCourseId` when `raw` is not an integer id.
pub fn parse_course_id(raw: &str) -> Result<CourseId, ConfigError> {
    raw.parse::<CourseId>()
        .map_err(|_| ConfigError::InvalidCourseId(raw.to_owned()))
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            raw: raw.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_to_local_sqlite() {
        let cfg = config(&[]).unwrap();
        assert_eq!(
            cfg.backend,
            Backend::Sqlite {
                db_url: DEFAULT_DB_URL.into()
            }
        );
        assert_eq!(cfg.policy, ApprovalPolicy::AnyApproved);
        assert!(!cfg.admin);
        assert!(cfg.course_id.is_none());
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn rest_backend_requires_url_and_key() {
        let err = config(&[("COURSE_BACKEND", "rest"), ("COURSE_REST_URL", "https://x.test")])
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingRestSetting("COURSE_REST_KEY"));

        let cfg = config(&[
            ("COURSE_BACKEND", "REST"),
            ("COURSE_REST_URL", "https://x.test"),
            ("COURSE_REST_KEY", "anon"),
        ])
        .unwrap();
        assert_eq!(
            cfg.backend,
            Backend::Rest {
                url: "https://x.test".into(),
                key: "anon".into(),
            }
        );
        assert_eq!(cfg.backend.name(), "rest");
    }

    #[test]
    fn parses_session_settings() {
        let cfg = config(&[
            ("COURSE_ID", "7"),
            ("COURSE_LEARNER", "alice"),
            ("COURSE_ADMIN", "true"),
            ("COURSE_APPROVAL_POLICY", "latest"),
        ])
        .unwrap();
        assert_eq!(cfg.course_id, Some(CourseId::new(7)));
        assert_eq!(cfg.learner.as_deref(), Some("alice"));
        assert!(cfg.admin);
        assert_eq!(cfg.policy, ApprovalPolicy::MostRecent);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config(&[("COURSE_BACKEND", "mongo")]).unwrap_err(),
            ConfigError::UnknownBackend(_)
        ));
        assert!(matches!(
            config(&[("COURSE_ID", "abc")]).unwrap_err(),
            ConfigError::InvalidCourseId(_)
        ));
        assert!(matches!(
            config(&[("COURSE_ADMIN", "maybe")]).unwrap_err(),
            ConfigError::InvalidFlag { .. }
        ));
    }
}
