//! Line-based automation command server.
//!
//! `sikulid` listens on a TCP port, reads one whitespace-separated command per
//! connection and runs the automation engine as
//! `<engine> -r <script folder> -- <tokens...>`. The merged stdout and stderr
//! of the run is returned to the client as a single `OK:` line; any failure
//! while handling the connection becomes a single `ERROR:` line for that
//! client only.
//!
//! Connections are served by a fixed pool of worker threads sized by the
//! configuration. A worker is occupied for the whole engine run, so at most
//! `worker_count` engine processes run concurrently and further connections
//! wait in the queue.
//!
//! The [`Server`] lifecycle moves through `Stopped`, `Starting`, `Running` and
//! `Stopping`. [`Server::stop`] may be called any number of times from any
//! thread; the binary wires it to SIGTERM, SIGINT, SIGQUIT and SIGHUP through
//! [`SystemShutdownSignal`].

pub mod dispatch;
mod health;
mod lifecycle;
pub mod runner;
pub mod telemetry;
mod transport;

pub use health::{HealthReporter, StructuredHealthReporter};
pub use lifecycle::{
    Lifecycle, Server, ServerError, ServerState, ShutdownError, ShutdownSignal, StopTrigger,
    SystemShutdownSignal,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ListenerError, PoolError};

#[cfg(test)]
mod tests;
