//! Unit tests for the TCP listener accept loop.

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use crate::lifecycle::Lifecycle;
use crate::tests::support::wait_for;

use super::{
    ConnectionHandler, CountingHandler, ListenerError, ListenerSlot, SocketListener, WorkerPool,
};

fn starting_lifecycle() -> Arc<Lifecycle> {
    let lifecycle = Arc::new(Lifecycle::new());
    lifecycle.begin_start().expect("start lifecycle");
    lifecycle
}

/// Opens a slot on an ephemeral port and marks the lifecycle running.
fn open_slot() -> (Arc<ListenerSlot>, Arc<Lifecycle>, std::net::SocketAddr) {
    let lifecycle = starting_lifecycle();
    let slot = Arc::new(ListenerSlot::default());
    let addr = slot
        .open(&lifecycle, "127.0.0.1", 0)
        .expect("bind listener")
        .expect("lifecycle is starting");
    assert!(lifecycle.mark_running());
    (slot, lifecycle, addr)
}

fn spawn_accept_loop(
    slot: &Arc<ListenerSlot>,
    lifecycle: &Arc<Lifecycle>,
    handler: Arc<dyn ConnectionHandler>,
) -> thread::JoinHandle<()> {
    let slot = Arc::clone(slot);
    let lifecycle = Arc::clone(lifecycle);
    thread::spawn(move || {
        let mut pool = WorkerPool::new(NonZeroUsize::new(2).expect("non-zero")).expect("spawn pool");
        slot.serve(&lifecycle, &pool, &handler);
        pool.shutdown();
    })
}

fn read_reply(addr: std::net::SocketAddr) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect client");
    let mut reply = String::new();
    stream.read_to_string(&mut reply).expect("read reply");
    reply
}

#[test]
fn accepts_connections_until_stopped() {
    let (slot, lifecycle, addr) = open_slot();
    let handler = CountingHandler::default();
    let count = handler.count();
    let accept_loop = spawn_accept_loop(&slot, &lifecycle, Arc::new(handler));

    assert_eq!(read_reply(addr), "OK: counted\n");
    assert_eq!(read_reply(addr), "OK: counted\n");
    assert!(wait_for(|| count.load(Ordering::SeqCst) == 2));

    lifecycle.request_stop();
    accept_loop.join().expect("join accept loop");

    assert!(
        TcpStream::connect(addr).is_err(),
        "port should be released after the loop exits"
    );
    assert_eq!(slot.close(), None);
}

#[test]
fn closing_while_stopping_refuses_connections_immediately() {
    let (slot, lifecycle, addr) = open_slot();
    let accept_loop = spawn_accept_loop(&slot, &lifecycle, Arc::new(CountingHandler::default()));

    assert!(lifecycle.request_stop());
    slot.close_if_stopping(&lifecycle);

    assert!(
        TcpStream::connect(addr).is_err(),
        "port should be closed as soon as the slot is emptied"
    );
    accept_loop.join().expect("join accept loop");
}

#[test]
fn close_if_stopping_keeps_a_running_socket() {
    let (slot, lifecycle, addr) = open_slot();

    assert_eq!(slot.close_if_stopping(&lifecycle), None);
    assert_eq!(slot.close(), Some(addr));
}

#[test]
fn open_skips_binding_after_a_stop_request() {
    let lifecycle = starting_lifecycle();
    assert!(lifecycle.request_stop());
    let slot = ListenerSlot::default();

    let opened = slot.open(&lifecycle, "127.0.0.1", 0).expect("no bind attempted");

    assert_eq!(opened, None);
    assert_eq!(slot.close(), None);
}

#[test]
fn bind_reports_port_in_use() {
    let occupied = TcpListener::bind(("127.0.0.1", 0)).expect("occupy port");
    let port = occupied.local_addr().expect("occupied addr").port();

    let error = SocketListener::bind("127.0.0.1", port).expect_err("port is taken");

    assert!(matches!(error, ListenerError::BindTcp { .. }));
}

#[test]
fn bind_reports_unresolvable_host() {
    let error =
        SocketListener::bind("host.invalid.", 5000).expect_err("host does not resolve");

    assert!(matches!(
        error,
        ListenerError::Resolve { .. } | ListenerError::ResolveEmpty { .. }
    ));
}

#[test]
fn bind_assigns_ephemeral_port() {
    let listener = SocketListener::bind("127.0.0.1", 0).expect("bind listener");
    assert_ne!(listener.local_addr().port(), 0);
}
