//! Built-in defaults for the server and client configuration.

use std::num::NonZeroUsize;

use crate::logging::LogFormat;

/// Port used when none is supplied or the supplied value is not a valid port.
pub const DEFAULT_PORT: u16 = 5000;

/// Interface the server binds to by default (all IPv4 interfaces).
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Script folder handed to the automation engine by default.
pub const DEFAULT_SCRIPT_FOLDER: &str = "./execution.sikuli";

/// Worker count used when none is supplied or the supplied value is invalid.
pub const DEFAULT_WORKER_COUNT: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(count) => count,
    None => NonZeroUsize::MIN,
};

/// File name of the automation engine launcher inside the installation directory.
#[cfg(not(windows))]
pub const DEFAULT_ENGINE: &str = "sikulix";

/// File name of the automation engine launcher inside the installation directory.
#[cfg(windows)]
pub const DEFAULT_ENGINE: &str = "sikulix.cmd";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
