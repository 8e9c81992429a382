//! Fixed-size worker pool for connection jobs.
//!
//! Jobs are queued on an unbounded channel and picked up by the first idle
//! worker. Shutdown closes the queue and waits for every worker to finish the
//! jobs already queued, so in-flight connections are never cut short.

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use super::{LISTENER_TARGET, PoolError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pool of named worker threads fed by a shared queue.
#[derive(Debug)]
pub(crate) struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers.
    pub(crate) fn new(size: NonZeroUsize) -> Result<Self, PoolError> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut pool = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(size.get()),
        };

        for index in 0..size.get() {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("sikulid-worker-{index}"))
                .spawn(move || run_worker(index, &receiver))
                .map_err(|source| PoolError::Spawn {
                    index,
                    source: Arc::new(source),
                })?;
            pool.workers.push(handle);
        }
        debug!(target: LISTENER_TARGET, workers = size.get(), "worker pool ready");
        Ok(pool)
    }

    /// Number of worker threads.
    pub(crate) fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues a job for the next idle worker.
    pub(crate) fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(PoolError::Closed)?;
        sender.send(Box::new(job)).map_err(|_| PoolError::Closed)
    }

    /// Closes the queue and joins every worker once queued jobs have run.
    pub(crate) fn shutdown(&mut self) {
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!(target: LISTENER_TARGET, "worker thread panicked outside a job");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(index: usize, receiver: &Mutex<Receiver<Job>>) {
    loop {
        // The guard is released before the job runs so other workers can
        // dequeue in the meantime.
        let next = receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();
        let Ok(job) = next else {
            break;
        };
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(target: LISTENER_TARGET, worker = index, "connection job panicked");
        }
    }
    debug!(target: LISTENER_TARGET, worker = index, "worker exiting");
}
