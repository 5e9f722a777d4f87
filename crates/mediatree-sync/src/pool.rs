//! Bounded worker pools
//!
//! A [`WorkerPool`] is an unbounded FIFO queue of boxed futures served by a
//! fixed number of workers. Producers never block: back-pressure shows up
//! as queue growth. Each job runs on its own tokio task so a panicking job
//! is contained and reported without taking its worker down.
//!
//! Every worker checks the pool's [`CancellationToken`] before starting a
//! job; once it fires, queued jobs are dropped unexecuted while jobs that
//! already started run to completion.
//!
//! ## Shutdown
//!
//! [`WorkerPool::drain`] closes the pool's own sender and waits for the
//! queue to empty. Jobs submitted through [`PoolHandle`] clones still alive
//! elsewhere keep the pool open, so producers must drop their handles (or
//! be drained themselves) first.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Counters of one pool
#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicUsize,
    executed: AtomicUsize,
    discarded: AtomicUsize,
    panicked: AtomicUsize,
}

/// Final counters of a drained pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub submitted: usize,
    pub executed: usize,
    /// Jobs dropped because the pool was cancelled before they started
    pub discarded: usize,
    pub panicked: usize,
}

// ============================================================================
// PoolHandle
// ============================================================================

/// Cloneable submission side of a [`WorkerPool`]
#[derive(Clone)]
pub struct PoolHandle {
    name: &'static str,
    sender: mpsc::UnboundedSender<Job>,
    counters: Arc<PoolCounters>,
}

impl PoolHandle {
    /// Queues `job`; returns false if the pool is already shut down
    pub fn submit<F>(&self, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.sender.send(Box::pin(job)) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                debug!(pool = self.name, "Submit after shutdown ignored");
                false
            }
        }
    }
}

// ============================================================================
// WorkerPool
// ============================================================================

/// Fixed-size pool of async workers over an unbounded queue
pub struct WorkerPool {
    name: &'static str,
    handle: Option<PoolHandle>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    /// Spawns `workers` workers (at least one)
    ///
    /// # Arguments
    /// * `name` - Pool name used in logs
    /// * `workers` - Maximum number of concurrently running jobs
    /// * `cancel` - Token checked before each job starts
    pub fn new(name: &'static str, workers: usize, cancel: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(PoolCounters::default());

        let workers = (0..workers.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let counters = Arc::clone(&counters);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(job) = next else {
                            break;
                        };
                        if cancel.is_cancelled() {
                            counters.discarded.fetch_add(1, Ordering::Relaxed);
                            continue;
                        }
                        match tokio::spawn(job).await {
                            Ok(()) => {
                                counters.executed.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                counters.panicked.fetch_add(1, Ordering::Relaxed);
                                error!(pool = name, worker, error = %e, "Pool job failed");
                            }
                        }
                    }
                })
            })
            .collect();

        debug!(pool = name, "Worker pool started");
        Self {
            name,
            handle: Some(PoolHandle {
                name,
                sender,
                counters: Arc::clone(&counters),
            }),
            workers,
            counters,
        }
    }

    /// A new submission handle, `None` after [`WorkerPool::drain`] started
    pub fn handle(&self) -> Option<PoolHandle> {
        self.handle.clone()
    }

    /// Closes the pool's own sender and waits for every queued job
    pub async fn drain(mut self) -> PoolSummary {
        self.handle = None;
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                error!(pool = self.name, error = %e, "Pool worker failed");
            }
        }
        let summary = PoolSummary {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            executed: self.counters.executed.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
        };
        debug!(pool = self.name, ?summary, "Worker pool drained");
        summary
    }
}
