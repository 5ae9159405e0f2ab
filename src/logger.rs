//! Logging initialisation via tracing-subscriber.
//!
//! The configured level is validated with [`parse_level`] when config is
//! resolved; [`init`] then installs the subscriber once at startup.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Initialise the global tracing subscriber, writing to stderr.
///
/// With `force_level` unset, a valid `RUST_LOG` (which may carry per-target
/// directives such as `coursebot=debug,tower_http=info`) wins over `level`.
/// With it set, as after `-v` flags, `level` applies to every target.
pub fn init(level: LevelFilter, force_level: bool) -> Result<(), AppError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(env) if !force_level => env,
        _ => EnvFilter::default().add_directive(level.into()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Parse a plain level name (`off`, `error` … `trace`, any case).
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    let level = level.trim();
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}

/// Map the number of `-v` flags to a level override.
///
/// `-v` warn, `-vv` info, `-vvv` debug, more is trace. Zero flags: no override.
pub fn level_for_verbosity(verbosity: u8) -> Option<LevelFilter> {
    match verbosity {
        0 => None,
        1 => Some(LevelFilter::WARN),
        2 => Some(LevelFilter::INFO),
        3 => Some(LevelFilter::DEBUG),
        _ => Some(LevelFilter::TRACE),
    }
}
