//! TCP transport helpers for the client.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::AppError;

/// Connect timeout used when only probing whether the server is reachable.
pub(super) const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

pub(super) fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, AppError> {
    let endpoint = format!("{host}:{port}");
    let address = resolve_tcp_address(host, port).map_err(|source| AppError::Resolve {
        endpoint: endpoint.clone(),
        source,
    })?;
    TcpStream::connect_timeout(&address, timeout)
        .map_err(|source| AppError::Connect { endpoint, source })
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

/// Sends `line` and returns the single response line without its terminator.
pub(super) fn exchange(
    stream: TcpStream,
    line: &str,
    timeout: Duration,
) -> Result<String, AppError> {
    stream
        .set_read_timeout(Some(timeout))
        .and_then(|()| stream.set_write_timeout(Some(timeout)))
        .map_err(AppError::ConfigureTimeout)?;

    let mut writer = &stream;
    writer
        .write_all(format!("{line}\n").as_bytes())
        .and_then(|()| writer.flush())
        .map_err(AppError::SendRequest)?;

    let mut response = String::new();
    let read = BufReader::new(&stream)
        .read_line(&mut response)
        .map_err(AppError::ReadResponse)?;
    if read == 0 {
        return Err(AppError::MissingResponse);
    }
    let trimmed_len = response.trim_end_matches(['\r', '\n']).len();
    response.truncate(trimmed_len);
    Ok(response)
}
