//! Shared configuration for the automation dispatch server and its client.
//!
//! The server is started as `sikulid [PORT] [SCRIPT_FOLDER] [THREADS]` with
//! optional flags for the bind host, the engine location, an optional per-call
//! timeout and logging. Positional integers are parsed leniently: an invalid
//! value falls back to the documented default and produces a
//! [`ConfigWarning`] that the daemon logs once telemetry is running.

use std::ffi::OsString;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use thiserror::Error;

mod defaults;
mod engine;
mod logging;

pub use defaults::{
    DEFAULT_ENGINE, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_SCRIPT_FOLDER,
    DEFAULT_WORKER_COUNT, default_log_filter, default_log_format,
};
pub use engine::{installation_dir, resolve_engine};
pub use logging::{LogFormat, LogFormatParseError};

/// Command-line interface of the dispatch server.
#[derive(Parser, Debug)]
#[command(
    name = "sikulid",
    about = "Accepts line-based automation commands over TCP and runs them through the automation engine"
)]
pub struct Cli {
    /// TCP port to listen on.
    #[arg(value_name = "PORT", allow_negative_numbers = true)]
    pub port: Option<String>,
    /// Script folder passed to the automation engine with `-r`.
    #[arg(value_name = "SCRIPT_FOLDER")]
    pub script_folder: Option<Utf8PathBuf>,
    /// Number of worker threads serving connections.
    #[arg(value_name = "THREADS", allow_negative_numbers = true)]
    pub threads: Option<String>,
    /// Interface to bind.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// Automation engine executable, relative to the installation directory
    /// unless absolute.
    #[arg(long, value_name = "PATH")]
    pub engine: Option<PathBuf>,
    /// Kill engine runs that take longer than this many seconds.
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,
    /// Report non-zero engine exit statuses as errors.
    #[arg(long)]
    pub strict_exit: bool,
    /// Tracing filter expression.
    #[arg(long, env = "SIKULID_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Log output format (`json` or `compact`).
    #[arg(long, env = "SIKULID_LOG_FORMAT", default_value_t = default_log_format())]
    pub log_format: LogFormat,
}

/// Non-fatal problems found while resolving the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The port argument was not a valid TCP port.
    InvalidPort {
        /// Raw argument value.
        value: String,
    },
    /// The threads argument was not a positive integer.
    InvalidThreads {
        /// Raw argument value.
        value: String,
    },
    /// The installation directory could not be determined.
    InstallDirUnknown {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { value } => {
                write!(f, "invalid port '{value}', using default {DEFAULT_PORT}")
            }
            Self::InvalidThreads { value } => write!(
                f,
                "invalid thread count '{value}', using default {DEFAULT_WORKER_COUNT}"
            ),
            Self::InstallDirUnknown { reason } => write!(
                f,
                "cannot determine installation directory ({reason}), resolving engine against the working directory"
            ),
        }
    }
}

/// Errors that prevent configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Argument parsing failed, or help/version output was requested.
    #[error("{0}")]
    Cli(#[from] clap::Error),
}

/// Resolved server configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    host: String,
    port: u16,
    worker_count: NonZeroUsize,
    script_folder: Utf8PathBuf,
    engine: PathBuf,
    timeout: Option<Duration>,
    strict_exit: bool,
    log_filter: String,
    log_format: LogFormat,
}

/// Configuration together with the warnings raised while resolving it.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved configuration.
    pub config: ServerConfig,
    /// Fallbacks applied during resolution.
    pub warnings: Vec<ConfigWarning>,
}

impl ServerConfig {
    /// Builds a configuration with the three core settings and defaults for
    /// everything else. The engine defaults to [`DEFAULT_ENGINE`] in the
    /// working directory.
    #[must_use]
    pub fn new(port: u16, worker_count: NonZeroUsize, script_folder: impl Into<Utf8PathBuf>) -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port,
            worker_count,
            script_folder: script_folder.into(),
            engine: PathBuf::from(DEFAULT_ENGINE),
            timeout: None,
            strict_exit: false,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
        }
    }

    /// Parses the process arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cli`] when clap rejects the arguments.
    pub fn load() -> Result<LoadedConfig, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Parses the supplied arguments; the first item is the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cli`] when clap rejects the arguments.
    pub fn load_from_iter<I, T>(args: I) -> Result<LoadedConfig, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args)?;
        let mut warnings = Vec::new();
        let install_dir = installation_dir().unwrap_or_else(|warning| {
            warnings.push(warning);
            PathBuf::from(".")
        });
        let config = Self::from_cli(cli, &install_dir, &mut warnings);
        Ok(LoadedConfig { config, warnings })
    }

    /// Resolves parsed arguments, recording any fallbacks in `warnings`.
    #[must_use]
    pub fn from_cli(cli: Cli, install_dir: &Path, warnings: &mut Vec<ConfigWarning>) -> Self {
        let port = match cli.port {
            None => DEFAULT_PORT,
            Some(value) => value.trim().parse::<u16>().unwrap_or_else(|_| {
                warnings.push(ConfigWarning::InvalidPort { value });
                DEFAULT_PORT
            }),
        };
        let worker_count = match cli.threads {
            None => DEFAULT_WORKER_COUNT,
            Some(value) => value
                .trim()
                .parse::<NonZeroUsize>()
                .unwrap_or_else(|_| {
                    warnings.push(ConfigWarning::InvalidThreads { value });
                    DEFAULT_WORKER_COUNT
                }),
        };
        let script_folder = cli
            .script_folder
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_SCRIPT_FOLDER));

        Self {
            host: cli.host,
            port,
            worker_count,
            script_folder,
            engine: resolve_engine(cli.engine.as_deref(), install_dir),
            timeout: cli.timeout_secs.map(Duration::from_secs),
            strict_exit: cli.strict_exit,
            log_filter: cli.log_filter,
            log_format: cli.log_format,
        }
    }

    /// Replaces the bind host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Replaces the engine executable path.
    #[must_use]
    pub fn with_engine(mut self, engine: impl Into<PathBuf>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Sets the per-call engine timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables strict exit status handling.
    #[must_use]
    pub const fn with_strict_exit(mut self, strict_exit: bool) -> Self {
        self.strict_exit = strict_exit;
        self
    }

    /// Interface to bind.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port to bind; `0` requests an ephemeral port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Size of the connection worker pool.
    #[must_use]
    pub const fn worker_count(&self) -> NonZeroUsize {
        self.worker_count
    }

    /// Script folder handed to the engine.
    #[must_use]
    pub fn script_folder(&self) -> &Utf8Path {
        &self.script_folder
    }

    /// Engine executable.
    #[must_use]
    pub fn engine(&self) -> &Path {
        &self.engine
    }

    /// Per-call engine timeout; `None` waits indefinitely.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether non-zero engine exits are reported as errors.
    #[must_use]
    pub const fn strict_exit(&self) -> bool {
        self.strict_exit
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORT, DEFAULT_WORKER_COUNT, DEFAULT_SCRIPT_FOLDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resolve(args: &[&str]) -> (ServerConfig, Vec<ConfigWarning>) {
        let cli = Cli::try_parse_from(std::iter::once("sikulid").chain(args.iter().copied()))
            .expect("arguments should parse");
        let mut warnings = Vec::new();
        let config = ServerConfig::from_cli(cli, Path::new("/opt/sikulid"), &mut warnings);
        (config, warnings)
    }

    #[test]
    fn no_arguments_apply_defaults() {
        let (config, warnings) = resolve(&[]);
        assert!(warnings.is_empty());
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.worker_count(), DEFAULT_WORKER_COUNT);
        assert_eq!(config.script_folder().as_str(), DEFAULT_SCRIPT_FOLDER);
        assert_eq!(config.host(), DEFAULT_HOST);
        assert_eq!(config.engine(), Path::new("/opt/sikulid").join(DEFAULT_ENGINE));
        assert_eq!(config.timeout(), None);
        assert!(!config.strict_exit());
    }

    #[test]
    fn positional_arguments_are_applied_in_order() {
        let (config, warnings) = resolve(&["5500", "/tmp/fake", "2"]);
        assert!(warnings.is_empty());
        assert_eq!(config.port(), 5500);
        assert_eq!(config.script_folder().as_str(), "/tmp/fake");
        assert_eq!(config.worker_count().get(), 2);
    }

    #[rstest]
    #[case("abc")]
    #[case("70000")]
    #[case("")]
    #[case("-1")]
    fn invalid_port_falls_back_with_warning(#[case] port: &str) {
        let (config, warnings) = resolve(&[port]);
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(
            warnings,
            vec![ConfigWarning::InvalidPort {
                value: port.to_owned()
            }]
        );
    }

    #[rstest]
    #[case("many")]
    #[case("0")]
    #[case("-3")]
    fn invalid_threads_fall_back_with_warning(#[case] threads: &str) {
        let (config, warnings) = resolve(&["5000", "./scripts", threads]);
        assert_eq!(config.worker_count(), DEFAULT_WORKER_COUNT);
        assert_eq!(
            warnings,
            vec![ConfigWarning::InvalidThreads {
                value: threads.to_owned()
            }]
        );
    }

    #[test]
    fn negative_integers_fall_back_alongside_flags() {
        let (config, warnings) = resolve(&["-1", "./execution.sikuli", "-3", "--strict-exit"]);
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.worker_count(), DEFAULT_WORKER_COUNT);
        assert!(config.strict_exit());
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn flags_override_expansion_settings() {
        let (config, _) = resolve(&[
            "--host",
            "127.0.0.1",
            "--timeout-secs",
            "30",
            "--strict-exit",
            "--log-format",
            "json",
        ]);
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(config.strict_exit());
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = Cli::try_parse_from(["sikulid", "--timeout-secs", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn warnings_render_the_fallback_value() {
        let warning = ConfigWarning::InvalidPort {
            value: "abc".to_owned(),
        };
        assert_eq!(warning.to_string(), "invalid port 'abc', using default 5000");
    }
}
