//! Connection handler for the one-line command protocol.
//!
//! Each connection carries exactly one exchange: the handler reads a single
//! request line, routes it, writes a single response line and closes the
//! stream. The stream is owned by the handler, so it is closed on every exit
//! path, including unwinding out of the router.

use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::runner::ProcessRunner;
use crate::transport::ConnectionHandler;

use super::command::Command;
use super::errors::DispatchError;
use super::response::{Response, ResponseWriter};
use super::router::{CommandRouter, DISPATCH_TARGET};

/// Maximum size of a single request line in bytes.
pub(crate) const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Upper bound on input discarded after rejecting an oversized request.
const MAX_DISCARD_BYTES: u64 = 1024 * 1024;
const DISCARD_TIMEOUT: Duration = Duration::from_secs(1);

/// Connection handler that reads one command line and answers with one line.
#[derive(Debug)]
pub struct LineConnectionHandler<R> {
    router: CommandRouter<R>,
}

impl<R: ProcessRunner> LineConnectionHandler<R> {
    /// Creates a handler dispatching through `router`.
    pub const fn new(router: CommandRouter<R>) -> Self {
        Self { router }
    }

    fn dispatch(&self, mut stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map_or_else(|_| String::from("unknown"), |addr| addr.to_string());

        let (response, unread_input) = match read_request_line(&mut stream) {
            Ok(Some(request)) => (self.respond(&peer, &request), false),
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, %peer, "client disconnected without request");
                return;
            }
            Err(error) if error.is_transport() => {
                warn!(target: DISPATCH_TARGET, %peer, %error, "failed to read request");
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %peer, %error, "rejected request");
                let unread = matches!(error, DispatchError::RequestTooLarge { .. });
                (Response::from_error(&error), unread)
            }
        };

        if let Err(error) = ResponseWriter::new(&mut stream).write(&response) {
            warn!(target: DISPATCH_TARGET, %peer, %error, "failed to write response");
            return;
        }
        // Signal end-of-response before the stream is dropped.
        drop(stream.shutdown(Shutdown::Write));
        if unread_input {
            discard_unread(&mut stream);
        }
    }

    /// Builds the response for one raw request line.
    pub(crate) fn respond(&self, peer: &str, request: &[u8]) -> Response {
        let outcome = decode_line(request).and_then(|line| {
            info!(target: DISPATCH_TARGET, %peer, line, "received command");
            let command = Command::parse(line)?;
            self.router.route(&command)
        });
        if let Err(error) = &outcome {
            warn!(target: DISPATCH_TARGET, %peer, %error, "command failed");
        }
        Response::from(outcome)
    }
}

impl<R: ProcessRunner + 'static> ConnectionHandler for LineConnectionHandler<R> {
    fn handle(&self, stream: TcpStream) {
        self.dispatch(stream);
    }
}

/// Strips the line terminator and validates UTF-8.
fn decode_line(request: &[u8]) -> Result<&str, DispatchError> {
    let line = request.strip_suffix(b"\n").unwrap_or(request);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    std::str::from_utf8(line).map_err(|_| DispatchError::InvalidUtf8)
}

/// Reads a bounded request line from the stream.
///
/// Returns `Ok(None)` if the client disconnects without sending data.
/// Returns `Ok(Some(bytes))` when a complete line (or EOF with partial data)
/// is received. Bytes after the first newline are ignored.
fn read_request_line(stream: &mut impl Read) -> Result<Option<Vec<u8>>, DispatchError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        let bytes_read = read_with_retry(stream, &mut chunk)?;
        let Some(received) = chunk.get(..bytes_read) else {
            return Err(DispatchError::Io(io::Error::other("read past buffer end")));
        };

        if received.is_empty() {
            return Ok(if buffer.is_empty() {
                None
            } else {
                Some(buffer)
            });
        }

        if let Some(newline_pos) = received.iter().position(|b| *b == b'\n') {
            buffer.extend_from_slice(received.get(..=newline_pos).unwrap_or(received));
            enforce_limit(buffer.len())?;
            return Ok(Some(buffer));
        }

        buffer.extend_from_slice(received);
        enforce_limit(buffer.len())?;
    }
}

/// Drops request bytes still queued on the socket so closing it does not
/// reset the connection ahead of the response.
fn discard_unread(stream: &mut TcpStream) {
    if stream.set_read_timeout(Some(DISCARD_TIMEOUT)).is_err() {
        return;
    }
    let mut pending = stream.by_ref().take(MAX_DISCARD_BYTES);
    drop(io::copy(&mut pending, &mut io::sink()));
}

/// Reads from the stream, retrying on interrupts.
fn read_with_retry(stream: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Enforces the maximum request size limit.
const fn enforce_limit(size: usize) -> Result<(), DispatchError> {
    if size > MAX_REQUEST_BYTES {
        return Err(DispatchError::request_too_large(size, MAX_REQUEST_BYTES));
    }
    Ok(())
}
