//! Server lifecycle state machine.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::ServerError;

/// Observable phase of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    /// Not accepting connections.
    #[default]
    Stopped,
    /// Binding the socket and spawning workers.
    Starting,
    /// Accepting connections.
    Running,
    /// Draining in-flight connections after a stop request.
    Stopping,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(label)
    }
}

/// Shared lifecycle state guarded by a mutex and condition variable.
///
/// Transitions follow `Stopped -> Starting -> Running -> Stopping -> Stopped`.
/// A stop may also arrive while `Starting`, in which case the server moves
/// straight to `Stopping` once startup observes it.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: Mutex<ServerState>,
    changed: Condvar,
}

impl Lifecycle {
    /// Creates a lifecycle in the `Stopped` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        *self.lock()
    }

    /// Whether the accept loop should keep running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// Moves `Stopped` to `Starting`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyStarted`] from any other state.
    pub fn begin_start(&self) -> Result<(), ServerError> {
        let mut state = self.lock();
        if *state != ServerState::Stopped {
            return Err(ServerError::AlreadyStarted { state: *state });
        }
        *state = ServerState::Starting;
        self.changed.notify_all();
        Ok(())
    }

    /// Moves `Starting` to `Running`.
    ///
    /// Returns `false` when a stop request arrived during startup.
    pub fn mark_running(&self) -> bool {
        let mut state = self.lock();
        if *state != ServerState::Starting {
            return false;
        }
        *state = ServerState::Running;
        self.changed.notify_all();
        true
    }

    /// Requests a stop.
    ///
    /// Returns `true` only for the call that initiated the stop; repeated
    /// requests and requests while already stopped are no-ops.
    pub fn request_stop(&self) -> bool {
        let mut state = self.lock();
        match *state {
            ServerState::Starting | ServerState::Running => {
                *state = ServerState::Stopping;
                self.changed.notify_all();
                true
            }
            ServerState::Stopping | ServerState::Stopped => false,
        }
    }

    /// Moves to `Stopped` and wakes every waiter.
    pub fn mark_stopped(&self) {
        *self.lock() = ServerState::Stopped;
        self.changed.notify_all();
    }

    /// Blocks until the state is `Stopped`.
    pub fn wait_until_stopped(&self) {
        let guard = self.lock();
        drop(
            self.changed
                .wait_while(guard, |state| *state != ServerState::Stopped)
                .unwrap_or_else(PoisonError::into_inner),
        );
    }

    /// Blocks until `predicate` holds or `timeout` elapses.
    ///
    /// Returns the state observed last.
    pub fn wait_for(
        &self,
        timeout: Duration,
        predicate: impl Fn(ServerState) -> bool,
    ) -> ServerState {
        let guard = self.lock();
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |state| !predicate(*state))
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
