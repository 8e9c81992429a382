//! Shared transport test handlers.

use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ConnectionHandler;

/// Handler that counts connections and answers each with a fixed line.
#[derive(Debug, Default)]
pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.count)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, mut stream: TcpStream) {
        self.count.fetch_add(1, Ordering::SeqCst);
        drop(stream.write_all(b"OK: counted\n"));
    }
}
