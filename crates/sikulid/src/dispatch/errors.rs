//! Error types for request dispatch failures.
//!
//! Every variant is converted into an `ERROR:` line for the client that
//! caused it; none of them reach the accept loop.

use std::io;

use thiserror::Error;

use crate::runner::ProcessError;

/// Errors surfaced while reading, parsing or routing one request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request line contained no tokens.
    #[error("empty command")]
    EmptyCommand,

    /// Request exceeds the maximum allowed size.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },

    /// Request bytes were not UTF-8.
    #[error("request is not valid UTF-8")]
    InvalidUtf8,

    /// IO error while reading the request.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The engine could not be run.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The engine exited unsuccessfully and strict exit handling is enabled.
    #[error("engine exited with status {status}: {output}")]
    EngineExit {
        /// Exit code reported by the engine.
        status: i32,
        /// Captured engine output.
        output: String,
    },
}

impl DispatchError {
    /// Creates a request too large error.
    pub const fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }

    /// Whether the error came from the transport rather than the request.
    ///
    /// Transport failures end the connection without a response.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
