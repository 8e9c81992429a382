//! Server lifecycle: startup, accept loop ownership and graceful stop.
//!
//! [`Server::start`] runs the accept loop on the calling thread and returns
//! once a stop request has been observed and every in-flight connection has
//! been answered. [`Server::stop`] and [`StopTrigger::stop`] may be called
//! from any thread, any number of times.

mod errors;
mod server;
mod shutdown;
mod state;

pub use self::errors::ServerError;
pub use self::server::{Server, StopTrigger};
pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
pub use self::state::{Lifecycle, ServerState};

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");
