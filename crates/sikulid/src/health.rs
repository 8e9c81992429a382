//! Structured health reporting for server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use sikuli_config::ServerConfig;

use crate::lifecycle::ServerError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
#[cfg_attr(test, mockall::automock)]
pub trait HealthReporter: Send + Sync {
    /// Invoked before the socket is bound.
    fn server_starting(&self, config: &ServerConfig);

    /// Invoked once the socket is bound and workers are ready.
    fn server_listening(&self, addr: SocketAddr);

    /// Invoked when startup fails.
    fn start_failed(&self, error: &ServerError);

    /// Invoked when a stop request is accepted.
    fn server_stopping(&self);

    /// Invoked after in-flight connections drained.
    fn server_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn server_starting(&self, config: &ServerConfig) {
        (**self).server_starting(config);
    }

    fn server_listening(&self, addr: SocketAddr) {
        (**self).server_listening(addr);
    }

    fn start_failed(&self, error: &ServerError) {
        (**self).start_failed(error);
    }

    fn server_stopping(&self) {
        (**self).server_stopping();
    }

    fn server_stopped(&self) {
        (**self).server_stopped();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn server_starting(&self, config: &ServerConfig) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_starting",
            host = config.host(),
            port = config.port(),
            workers = config.worker_count().get(),
            script_folder = %config.script_folder(),
            engine = %config.engine().display(),
            "starting command server"
        );
    }

    fn server_listening(&self, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_listening",
            %addr,
            "command server listening"
        );
    }

    fn start_failed(&self, error: &ServerError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "start_failed",
            error = %error,
            "command server failed to start"
        );
    }

    fn server_stopping(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopping",
            "stopping command server"
        );
    }

    fn server_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopped",
            "command server stopped"
        );
    }
}
