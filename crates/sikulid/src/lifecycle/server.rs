//! Command server orchestration.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use sikuli_config::ServerConfig;
use tracing::{debug, info};

use crate::dispatch::{CommandRouter, EngineInvocation, LineConnectionHandler};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::runner::{ProcessRunner, SubprocessRunner};
use crate::transport::{ConnectionHandler, ListenerSlot, WorkerPool};

use super::{LIFECYCLE_TARGET, Lifecycle, ServerError, ServerState};

/// Line-based command server.
///
/// The server owns its configuration and the connection handler; the
/// listening socket and worker pool only exist for the duration of
/// [`Server::start`]. A stop request closes the socket before returning.
pub struct Server {
    config: ServerConfig,
    handler: Arc<dyn ConnectionHandler>,
    lifecycle: Arc<Lifecycle>,
    listener: Arc<ListenerSlot>,
    reporter: Arc<dyn HealthReporter>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl Server {
    /// Creates a server that runs the configured engine as a subprocess.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let runner = SubprocessRunner::new(config.timeout());
        Self::with_runner(config, runner)
    }

    /// Creates a server that dispatches commands through `runner`.
    #[must_use]
    pub fn with_runner<R>(config: ServerConfig, runner: R) -> Self
    where
        R: ProcessRunner + 'static,
    {
        let router = CommandRouter::new(runner, EngineInvocation::from_config(&config));
        Self {
            config,
            handler: Arc::new(LineConnectionHandler::new(router)),
            lifecycle: Arc::new(Lifecycle::new()),
            listener: Arc::new(ListenerSlot::default()),
            reporter: Arc::new(StructuredHealthReporter::new()),
            local_addr: Mutex::new(None),
        }
    }

    /// Replaces the health reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn HealthReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Configuration the server was built with.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.lifecycle.state()
    }

    /// Bound address while the server is running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a handle that stops this server from another thread.
    #[must_use]
    pub fn stop_trigger(&self) -> StopTrigger {
        StopTrigger {
            lifecycle: Arc::clone(&self.lifecycle),
            listener: Arc::clone(&self.listener),
            reporter: Arc::clone(&self.reporter),
        }
    }

    /// Binds the socket and serves connections until stopped.
    ///
    /// Blocks the calling thread. Returns `Ok(())` after a stop request once
    /// the port is released and every accepted connection has been answered.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyStarted`] when the server is not stopped,
    /// [`ServerError::Bind`] when the port cannot be bound and
    /// [`ServerError::Pool`] when worker threads cannot be spawned. The server
    /// is `Stopped` again after any of these.
    pub fn start(&self) -> Result<(), ServerError> {
        self.lifecycle.begin_start()?;
        self.reporter.server_starting(&self.config);

        let opened = self
            .listener
            .open(&self.lifecycle, self.config.host(), self.config.port())
            .map_err(|source| self.abort_start(ServerError::Bind(source)))?;
        let mut pool = WorkerPool::new(self.config.worker_count()).map_err(|source| {
            self.listener.close();
            self.abort_start(ServerError::Pool(source))
        })?;

        match opened {
            Some(addr) if self.lifecycle.mark_running() => {
                self.set_local_addr(Some(addr));
                self.reporter.server_listening(addr);
                self.listener.serve(&self.lifecycle, &pool, &self.handler);
            }
            _ => {
                debug!(target: LIFECYCLE_TARGET, "stop requested during startup");
                self.listener.close();
            }
        }

        self.set_local_addr(None);
        info!(
            target: LIFECYCLE_TARGET,
            workers = pool.size(),
            "draining in-flight connections"
        );
        pool.shutdown();
        self.lifecycle.mark_stopped();
        self.reporter.server_stopped();
        Ok(())
    }

    /// Requests a stop and closes the listening socket.
    ///
    /// Idempotent. Returns without waiting for in-flight connections; use
    /// [`Server::wait_until_stopped`] for that.
    pub fn stop(&self) {
        self.stop_trigger().stop();
    }

    /// Blocks until the server is `Stopped`.
    pub fn wait_until_stopped(&self) {
        self.lifecycle.wait_until_stopped();
    }

    fn abort_start(&self, error: ServerError) -> ServerError {
        self.reporter.start_failed(&error);
        self.lifecycle.mark_stopped();
        error
    }

    fn set_local_addr(&self, addr: Option<SocketAddr>) {
        *self
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = addr;
    }
}

/// Cloneable handle that requests a server stop.
#[derive(Clone)]
pub struct StopTrigger {
    lifecycle: Arc<Lifecycle>,
    listener: Arc<ListenerSlot>,
    reporter: Arc<dyn HealthReporter>,
}

impl StopTrigger {
    /// Requests a stop. Only the first call changes the lifecycle state.
    ///
    /// The listening socket is closed before this returns, so later
    /// connection attempts are refused. Returns `true` when this call
    /// initiated the stop.
    pub fn stop(&self) -> bool {
        let initiated = self.lifecycle.request_stop();
        if initiated {
            self.reporter.server_stopping();
        }
        self.listener.close_if_stopping(&self.lifecycle);
        initiated
    }
}
