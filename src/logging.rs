//! Logging infrastructure for tfs-tools.
//!
//! Optional tracing-based logging with support for:
//! - Output to stderr or a file
//! - Configurable log levels
//! - Text or JSON format
//!
//! Logging is off unless a level is given, so command output on stdout stays
//! clean for scripts.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub const ENV_LOG_LEVEL: &str = "TFS_TOOLS_LOG_LEVEL";
pub const ENV_LOG_FILE: &str = "TFS_TOOLS_LOG_FILE";
pub const ENV_LOG_FORMAT: &str = "TFS_TOOLS_LOG_FORMAT";

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a log level from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// Log level (None means logging is disabled).
    pub level: Option<LogLevel>,
    /// Output file path (None means stderr).
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

/// Guard that must be held to ensure logs are flushed.
///
/// Dropping it flushes pending log lines. Hold it until the process exits.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Initialize the logging system.
///
/// Returns `None` when logging is disabled or the log file cannot be opened.
///
/// # Example
///
/// ```rust,no_run
/// use tfs_tools::logging::{LogConfig, LogFormat, LogLevel, init_logging};
/// use std::path::PathBuf;
///
/// let config = LogConfig {
///     level: Some(LogLevel::Debug),
///     file: Some(PathBuf::from("/tmp/tfs-tools.log")),
///     format: LogFormat::Json,
/// };
///
/// let _guard = init_logging(config);
/// ```
#[must_use = "the returned guard must be held until application exit"]
pub fn init_logging(config: LogConfig) -> Option<LogGuard> {
    let level = config.level?;

    // Only this crate's events; reqwest and hyper are noisy at debug.
    let filter = EnvFilter::new(format!("tfs_tools={}", level.as_filter_str()));

    let (writer, guard, to_file) = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (writer, guard, true)
        }
        None => {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            (writer, guard, false)
        }
    };

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .with_writer(writer)
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_file(to_file)
                .with_line_number(to_file);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        LogFormat::Text if to_file => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .compact();
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
    }

    Some(LogGuard { _guard: guard })
}

/// Parse logging configuration from command-line arguments and environment.
///
/// Runs before clap so that config loading itself can be traced.
/// Precedence: CLI args > environment variables.
#[must_use]
pub fn parse_early_log_config(args: &[String]) -> LogConfig {
    let level =
        extract_arg_value(args, "--log-level").or_else(|| std::env::var(ENV_LOG_LEVEL).ok());
    let file = extract_arg_value(args, "--log-file").or_else(|| std::env::var(ENV_LOG_FILE).ok());
    let format =
        extract_arg_value(args, "--log-format").or_else(|| std::env::var(ENV_LOG_FORMAT).ok());

    LogConfig {
        level: level.and_then(|s| LogLevel::parse(&s)),
        file: file.filter(|f| !f.is_empty()).map(PathBuf::from),
        format: format
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or_default(),
    }
}

/// Value following `flag`, accepting both `--flag value` and `--flag=value`.
fn extract_arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{}=", flag);
    args.iter()
        .find_map(|a| a.strip_prefix(&prefix).map(str::to_string))
        .or_else(|| args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn clear_env() {
        unsafe {
            std::env::remove_var(ENV_LOG_LEVEL);
            std::env::remove_var(ENV_LOG_FILE);
            std::env::remove_var(ENV_LOG_FORMAT);
        }
    }

    /// # Test: Log Level Parsing
    ///
    /// Verifies that log levels are parsed correctly from strings.
    ///
    /// ## Test Scenario
    /// - Parse valid log level strings (case-insensitive)
    /// - Parse invalid log level strings
    ///
    /// ## Expected Outcome
    /// - Valid strings return the corresponding LogLevel
    /// - Invalid strings return None
    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::parse("TRACE"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("Debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert_eq!(LogLevel::parse(""), None);
        assert_eq!(LogLevel::Warn.as_filter_str(), "warn");
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("yaml"), None);
    }

    /// # Test: Early Config Parsing from Args
    ///
    /// Verifies that logging flags are picked out of the raw argument list,
    /// wherever they appear relative to the subcommand.
    ///
    /// ## Expected Outcome
    /// - Space and `=` separated forms both work
    #[test]
    #[serial]
    fn test_early_config_from_args() {
        clear_env();
        let config = parse_early_log_config(&args(&[
            "tfs-tools",
            "wait",
            "4711",
            "--log-level",
            "debug",
            "--log-file=/tmp/tfs.log",
            "--log-format",
            "json",
        ]));

        assert_eq!(
            config,
            LogConfig {
                level: Some(LogLevel::Debug),
                file: Some(PathBuf::from("/tmp/tfs.log")),
                format: LogFormat::Json,
            }
        );
    }

    /// # Test: Environment Fallback
    ///
    /// Verifies that TFS_TOOLS_LOG_* apply when flags are absent and that
    /// flags win when both are set.
    #[test]
    #[serial]
    fn test_early_config_env_fallback() {
        clear_env();
        unsafe {
            std::env::set_var(ENV_LOG_LEVEL, "warn");
            std::env::set_var(ENV_LOG_FORMAT, "json");
        }

        let config = parse_early_log_config(&args(&["tfs-tools", "projects"]));
        assert_eq!(config.level, Some(LogLevel::Warn));
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.file.is_none());

        let config = parse_early_log_config(&args(&["tfs-tools", "--log-level", "trace"]));
        assert_eq!(config.level, Some(LogLevel::Trace));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_logging_disabled_without_level() {
        clear_env();
        let config = parse_early_log_config(&args(&["tfs-tools", "projects"]));
        assert!(config.level.is_none());
        assert!(init_logging(config).is_none());
    }

    #[test]
    fn test_extract_arg_value() {
        let list = args(&["cmd", "--flag", "value"]);
        assert_eq!(extract_arg_value(&list, "--flag"), Some("value".to_string()));
        assert_eq!(extract_arg_value(&list, "--other"), None);

        let list = args(&["cmd", "--flag"]);
        assert_eq!(extract_arg_value(&list, "--flag"), None);
    }
}
