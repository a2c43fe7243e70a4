use std::fmt;
use std::io::Write;

use course_core::model::{ApprovalPolicy, CourseId};
use services::{AppServices, Clock, SessionContext, StaticAuthCheck};
use storage::rest::RestConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod config;
mod repl;

use config::{AppConfig, Backend, ConfigError, parse_backend, parse_course_id};
use repl::{Flow, Repl};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidPolicy { raw: String },
    Config(ConfigError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidPolicy { raw } => {
                write!(f, "invalid --policy value (expected any or latest): {raw}")
            }
            ArgsError::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<ConfigError> for ArgsError {
    fn from(err: ConfigError) -> Self {
        ArgsError::Config(err)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --backend <sqlite|rest>   Storage backend (default: sqlite)");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --rest-url <url>          Hosted backend base URL");
    eprintln!("  --rest-key <key>          Hosted backend API key");
    eprintln!("  --course <id>             Course to open on start");
    eprintln!("  --learner <name>          Learner name used for progress and submissions");
    eprintln!("  --policy <any|latest>     How duplicate submissions count toward approval");
    eprintln!("  --admin                   Enable assignment review commands");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (overridden by flags, also read from .env):");
    eprintln!("  COURSE_BACKEND, COURSE_DB_URL, COURSE_REST_URL, COURSE_REST_KEY,");
    eprintln!("  COURSE_ID, COURSE_LEARNER, COURSE_ADMIN, COURSE_APPROVAL_POLICY, RUST_LOG");
}

/// Apply command-line flags on top of the environment configuration.
fn apply_args(
    mut config: AppConfig,
    args: &mut impl Iterator<Item = String>,
) -> Result<AppConfig, ArgsError> {
    let mut backend_name: Option<String> = None;
    let (mut db_url, mut rest_url, mut rest_key) = match &config.backend {
        Backend::Sqlite { db_url } => (Some(db_url.clone()), None, None),
        Backend::Rest { url, key } => (None, Some(url.clone()), Some(key.clone())),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--backend" => backend_name = Some(require_value(args, "--backend")?),
            "--db" => {
                let value = require_value(args, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                db_url = Some(value);
            }
            "--rest-url" => rest_url = Some(require_value(args, "--rest-url")?),
            "--rest-key" => rest_key = Some(require_value(args, "--rest-key")?),
            "--course" => {
                let value = require_value(args, "--course")?;
                config.course_id = Some(parse_course_id(&value)?);
            }
            "--learner" => config.learner = Some(require_value(args, "--learner")?),
            "--policy" => {
                let value = require_value(args, "--policy")?;
                config.policy = value
                    .parse::<ApprovalPolicy>()
                    .map_err(|_| ArgsError::InvalidPolicy { raw: value.clone() })?;
            }
            "--admin" => config.admin = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }

    let backend_name = backend_name.unwrap_or_else(|| config.backend.name().to_owned());
    config.backend = parse_backend(&backend_name, db_url, rest_url, rest_key)?;
    Ok(config)
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn build_services(config: &AppConfig) -> Result<AppServices, Box<dyn std::error::Error>> {
    let clock = Clock::default();
    let services = match &config.backend {
        Backend::Sqlite { db_url } => {
            AppServices::new_sqlite(db_url, clock, config.policy).await?
        }
        Backend::Rest { url, key } => AppServices::new_rest(
            RestConfig::new(url.clone(), key.clone()),
            clock,
            config.policy,
        )?,
    };
    Ok(services)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let config = apply_args(config, &mut std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing(&config.log_filter);
    tracing::info!(
        backend = config.backend.name(),
        policy = ?config.policy,
        "starting course session"
    );

    let services = build_services(&config).await?;
    let ctx = SessionContext::from_auth(&StaticAuthCheck::new(config.admin));

    let mut repl =
        Repl::new(services, ctx, std::io::stdout()).with_learner(config.learner.clone());
    let course_id = config.course_id.unwrap_or_else(|| CourseId::new(1));
    repl.open(course_id).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if repl.handle_line(&line).await? == Flow::Quit {
            break;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
