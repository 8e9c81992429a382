//! Error types for server startup.

use thiserror::Error;

use crate::transport::{ListenerError, PoolError};

use super::ServerState;

/// Errors surfaced by [`Server::start`](super::Server::start).
#[derive(Debug, Error)]
pub enum ServerError {
    /// `start` was called while the server was not stopped.
    #[error("server is already {state}")]
    AlreadyStarted {
        /// State observed by the rejected call.
        state: ServerState,
    },
    /// The listening socket could not be bound.
    #[error("failed to bind listening socket: {0}")]
    Bind(#[source] ListenerError),
    /// The worker pool could not be created.
    #[error("failed to start worker pool: {0}")]
    Pool(#[source] PoolError),
}
