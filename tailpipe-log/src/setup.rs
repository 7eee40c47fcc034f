use std::env;

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Crates which get the configured log level instead of the default.
const CRATE_NAMES: &[&str] = &[
    "tailpipe",
    "tailpipe_config",
    "tailpipe_log",
    "tailpipe_server",
];

/// Controls the log format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise
    /// [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    Pretty,

    /// Simplified plain text output.
    Simplified,

    /// Dump out JSON lines.
    Json,
}

/// The logging level, from quietest to loudest.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only bugs and invalid behavior.
    Error,
    /// Undesirable behavior and above.
    Warn,
    /// Messages relevant to the average operator and above.
    Info,
    /// Debugging information and above.
    Debug,
    /// Everything.
    Trace,
}

impl LogLevel {
    /// The level as a `tracing` filter.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Controls the logging system.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// The log level for the extension's own crates.
    pub level: LogLevel,

    /// Controls the log output format.
    ///
    /// Defaults to [`LogFormat::Auto`], which detects the best format based
    /// on the TTY.
    pub format: LogFormat,

    /// When set to `true`, backtraces are forced on.
    ///
    /// Otherwise, backtraces can be enabled by setting the `RUST_BACKTRACE`
    /// variable to `full`.
    pub enable_backtraces: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Auto,
            enable_backtraces: false,
        }
    }
}

/// Builds the default directive set: third-party crates at INFO, the
/// extension's own crates at the configured level.
fn default_filter(level: LevelFilter) -> EnvFilter {
    let mut directives = vec![LevelFilter::INFO.to_string()];
    directives.extend(CRATE_NAMES.iter().map(|name| format!("{name}={level}")));
    EnvFilter::new(directives.join(","))
}

/// Initializes the logging system.
///
/// An explicit `RUST_LOG` in the environment takes precedence over the
/// configured level.
pub fn init(config: &LogConfig) {
    if config.enable_backtraces {
        env::set_var("RUST_BACKTRACE", "full");
    }

    let filter = env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| default_filter(config.level.level_filter()));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match (config.format, console::user_attended()) {
        (LogFormat::Auto, true) | (LogFormat::Pretty, _) => {
            subscriber.pretty().try_init().ok();
        }
        (LogFormat::Auto, false) | (LogFormat::Simplified, _) => {
            subscriber.compact().with_ansi(false).try_init().ok();
        }
        (LogFormat::Json, _) => {
            subscriber.json().try_init().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Auto);
        assert!(!config.enable_backtraces);
    }

    #[test]
    fn test_level_filters() {
        assert_eq!(LogLevel::Error.level_filter(), LevelFilter::ERROR);
        assert_eq!(LogLevel::Trace.level_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn test_config_from_yaml_names() {
        let config: LogConfig = serde_json::from_value(serde_json::json!({
            "level": "debug",
            "format": "json",
        }))
        .unwrap();

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
    }
}
