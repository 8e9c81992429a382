//! Error types for the client runtime.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to resolve server address {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("failed to connect to server at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[error("failed to configure connection timeouts: {0}")]
    ConfigureTimeout(io::Error),
    #[error("failed to send command to server: {0}")]
    SendRequest(io::Error),
    #[error("failed to read response from server: {0}")]
    ReadResponse(io::Error),
    #[error("server closed the connection without responding")]
    MissingResponse,
    #[error("failed to forward server response: {0}")]
    ForwardResponse(io::Error),
}
