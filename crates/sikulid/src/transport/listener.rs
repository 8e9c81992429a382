//! Listener implementation for the command server's TCP socket.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::lifecycle::{Lifecycle, ServerState};

use super::{ConnectionHandler, LISTENER_TARGET, ListenerError, WorkerPool};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to a TCP address.
#[derive(Debug)]
pub(crate) struct SocketListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl SocketListener {
    /// Resolves `host` and binds the first address it yields.
    ///
    /// Binding is attempted once; a port already in use is reported, not
    /// retried.
    pub(crate) fn bind(host: &str, port: u16) -> Result<Self, ListenerError> {
        let listener = bind_tcp(host, port)?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr {
                source: Arc::new(source),
            })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking {
                source: Arc::new(source),
            })?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address the socket is bound to, including an OS-assigned port.
    pub(crate) const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn accept_connection(&self) -> Result<Option<(TcpStream, SocketAddr)>, io::Error> {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false)?;
                Ok(Some((stream, peer)))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// Shared owner of the listening socket.
///
/// The accept loop borrows the socket for each non-blocking accept. A stop
/// request takes it out of the slot, so the port is closed by the time the
/// request returns.
#[derive(Debug, Default)]
pub(crate) struct ListenerSlot {
    listener: Mutex<Option<SocketListener>>,
}

impl ListenerSlot {
    /// Binds `host:port` and installs the socket while `lifecycle` is
    /// `Starting`.
    ///
    /// Returns `Ok(None)` without binding when a stop request arrived first.
    pub(crate) fn open(
        &self,
        lifecycle: &Lifecycle,
        host: &str,
        port: u16,
    ) -> Result<Option<SocketAddr>, ListenerError> {
        let mut slot = self.lock();
        if lifecycle.state() != ServerState::Starting {
            return Ok(None);
        }
        let listener = SocketListener::bind(host, port)?;
        let addr = listener.local_addr();
        info!(target: LISTENER_TARGET, %addr, "socket listener active");
        *slot = Some(listener);
        Ok(Some(addr))
    }

    /// Closes the socket, if any, and returns the released address.
    pub(crate) fn close(&self) -> Option<SocketAddr> {
        let listener = self.lock().take()?;
        Some(release(listener))
    }

    /// Closes the socket once `lifecycle` has left `Running`.
    ///
    /// A concurrent [`ListenerSlot::open`] for a fresh start is left alone.
    pub(crate) fn close_if_stopping(&self, lifecycle: &Lifecycle) -> Option<SocketAddr> {
        let mut slot = self.lock();
        if lifecycle.state() != ServerState::Stopping {
            return None;
        }
        slot.take().map(release)
    }

    /// Accepts connections while the lifecycle is running.
    ///
    /// Every accepted stream is queued on `pool`. The socket is closed when
    /// this returns, so the port is released before the pool is drained.
    pub(crate) fn serve(
        &self,
        lifecycle: &Lifecycle,
        pool: &WorkerPool,
        handler: &Arc<dyn ConnectionHandler>,
    ) {
        let mut last_error = None::<io::ErrorKind>;
        while lifecycle.is_running() {
            match self.accept() {
                Ok(Some((stream, peer))) => {
                    last_error = None;
                    debug!(target: LISTENER_TARGET, %peer, "accepted connection");
                    let handler = Arc::clone(handler);
                    if let Err(error) = pool.submit(move || handler.handle(stream)) {
                        warn!(target: LISTENER_TARGET, %peer, %error, "dropping connection");
                    }
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) && lifecycle.is_running() {
                        warn!(
                            target: LISTENER_TARGET,
                            error = %error,
                            "socket accept error"
                        );
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        self.close();
    }

    fn accept(&self) -> Result<Option<(TcpStream, SocketAddr)>, io::Error> {
        match self.lock().as_ref() {
            Some(listener) => listener.accept_connection(),
            None => Ok(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<SocketListener>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn release(listener: SocketListener) -> SocketAddr {
    let addr = listener.local_addr();
    drop(listener);
    info!(target: LISTENER_TARGET, %addr, "socket listener closed");
    addr
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source: Arc::new(source),
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp {
        addr,
        source: Arc::new(source),
    })
}
