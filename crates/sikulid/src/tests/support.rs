//! Shared helpers for server tests.

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::lifecycle::{Server, ServerState};

/// Error code reported by Linux when executing a file that is still open for writing.
#[cfg(unix)]
const TEXT_FILE_BUSY: i32 = 26;

/// Writes an executable shell script into `dir` and waits until it can be run.
///
/// Another test thread may fork while the script is still open for writing;
/// the child briefly inherits the descriptor and `exec` reports "text file
/// busy" until it closes. Probing the script once absorbs that window so the
/// tests themselves never observe it. The probe exits before `body` runs.
#[cfg(unix)]
pub(crate) fn write_engine(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let script = format!("#!/bin/sh\n[ \"$1\" = \"--probe\" ] && exit 0\n{body}\n");
    std::fs::write(&path, script).expect("write engine script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("mark engine script executable");

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        match std::process::Command::new(&path)
            .arg("--probe")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
        {
            Ok(_) => break,
            Err(error)
                if error.raw_os_error() == Some(TEXT_FILE_BUSY) && Instant::now() < deadline =>
            {
                thread::sleep(Duration::from_millis(10));
            }
            Err(error) => panic!("engine script is not runnable: {error}"),
        }
    }
    path
}

/// Polls `condition` until it holds or two seconds pass.
pub(crate) fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Waits until the server reports `Running` and returns its bound address.
pub(crate) fn wait_until_listening(server: &Server) -> SocketAddr {
    assert!(
        wait_for(|| server.state() == ServerState::Running && server.local_addr().is_some()),
        "server did not start listening, state {:?}",
        server.state()
    );
    server.local_addr().expect("running server has an address")
}

/// Sends one request line and returns everything the server wrote back.
pub(crate) fn exchange(addr: SocketAddr, request: &[u8]) -> io::Result<String> {
    use std::io::{Read, Write};

    let mut stream = TcpStream::connect(addr)?;
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;
    stream.write_all(request)?;
    stream.flush()?;
    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    Ok(response)
}
