//! TCP transport for the command server.
//!
//! The transport module binds the listening socket, accepts connections on the
//! calling thread and hands each accepted stream to a fixed-size worker pool.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;
mod pool;
#[cfg(test)]
mod test_utils;

pub use self::errors::{ListenerError, PoolError};
pub(crate) use self::handler::ConnectionHandler;
pub(crate) use self::listener::ListenerSlot;
#[cfg(test)]
pub(crate) use self::listener::SocketListener;
pub(crate) use self::pool::WorkerPool;
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
