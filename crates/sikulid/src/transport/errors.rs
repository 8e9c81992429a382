//! Error types for socket listener and worker pool operations.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced while binding or running the socket listener.
#[derive(Debug, Clone, Error)]
pub enum ListenerError {
    /// The host name could not be resolved.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Requested host.
        host: String,
        /// Requested port.
        port: u16,
        /// Resolver error.
        #[source]
        source: Arc<io::Error>,
    },
    /// Resolution succeeded but produced no address.
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Requested host.
        host: String,
        /// Requested port.
        port: u16,
    },
    /// The socket could not be bound, typically because the port is in use.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Resolved address.
        addr: SocketAddr,
        /// Bind error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The bound socket did not report its address.
    #[error("failed to read local address of TCP listener: {source}")]
    LocalAddr {
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The socket could not be switched to non-blocking mode.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Errors surfaced by the worker pool.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker thread {index}: {source}")]
    Spawn {
        /// Zero-based worker index.
        index: usize,
        /// Spawn error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The pool no longer accepts jobs.
    #[error("worker pool is shut down")]
    Closed,
}
