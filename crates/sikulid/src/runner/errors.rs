//! Errors raised while running the automation engine.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Failures of the engine subprocess itself.
///
/// A non-zero exit status is not represented here; it is reported through
/// [`ExecutionResult::exit_code`](super::ExecutionResult::exit_code).
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// The executable could not be started (missing, not executable, no resources).
    #[error("failed to launch '{program}': {source}")]
    Launch {
        /// Executable that was requested.
        program: String,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The output pipe could not be set up or read.
    #[error("failed to capture output of '{program}': {source}")]
    Capture {
        /// Executable that was requested.
        program: String,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
    /// Waiting for the child failed.
    #[error("failed waiting for '{program}': {source}")]
    Wait {
        /// Executable that was requested.
        program: String,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The child outlived the configured timeout and was killed.
    #[error("'{program}' timed out after {timeout_ms} ms")]
    Timeout {
        /// Executable that was requested.
        program: String,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },
    /// The output collector thread panicked.
    #[error("output collector for '{program}' panicked")]
    CollectorPanic {
        /// Executable that was requested.
        program: String,
    },
}

impl ProcessError {
    pub(super) fn launch(program: &str, source: io::Error) -> Self {
        Self::Launch {
            program: program.to_owned(),
            source: Arc::new(source),
        }
    }

    pub(super) fn capture(program: &str, source: io::Error) -> Self {
        Self::Capture {
            program: program.to_owned(),
            source: Arc::new(source),
        }
    }

    pub(super) fn wait(program: &str, source: io::Error) -> Self {
        Self::Wait {
            program: program.to_owned(),
            source: Arc::new(source),
        }
    }
}
