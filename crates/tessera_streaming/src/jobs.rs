//! # Background Jobs
//!
//! Every submission runs on its own freshly spawned worker thread. When the
//! work returns, its message is appended to one shared completion queue.
//! The consumer drains that queue from its own thread.
//!
//! ## Locking
//!
//! ```text
//! worker:   compute ──► lock ─ push_back ─ unlock
//! consumer: lock ─ take whole batch ─ unlock ──► handle each message
//! ```
//!
//! The lock is never held while a message is handled, so a handler may
//! submit more work without deadlocking.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{StreamError, StreamResult};

/// A completion handler produced by a worker and run on the consumer.
pub type Deferred = Box<dyn FnOnce() + Send + 'static>;

struct QueueState<M> {
    /// Finished messages, in arrival order.
    ready: VecDeque<M>,
    /// Jobs submitted but not yet finished.
    in_flight: usize,
}

struct Shared<M> {
    state: Mutex<QueueState<M>>,
    /// Signalled whenever `in_flight` drops.
    settled: Condvar,
}

/// Decrements the in-flight count when the worker ends, even by panicking.
struct InFlightGuard<M> {
    shared: Arc<Shared<M>>,
}

impl<M> Drop for InFlightGuard<M> {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!(
                worker = thread::current().name().unwrap_or("?"),
                "terrain job panicked, its result is lost"
            );
        }
        self.shared.state.lock().in_flight -= 1;
        self.shared.settled.notify_all();
    }
}

/// Runs closures on background threads and queues their results.
pub struct JobRunner<M> {
    shared: Arc<Shared<M>>,
    worker_name: String,
    next_job: AtomicU64,
}

impl<M: Send + 'static> JobRunner<M> {
    /// Creates a runner; worker threads are named `{worker_name}-{n}`.
    #[must_use]
    pub fn new(worker_name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    ready: VecDeque::new(),
                    in_flight: 0,
                }),
                settled: Condvar::new(),
            }),
            worker_name: worker_name.into(),
            next_job: AtomicU64::new(0),
        }
    }

    /// Runs `work` on a new worker thread and queues whatever it returns.
    ///
    /// # Errors
    ///
    /// [`StreamError::WorkerSpawn`] if the thread could not be started. The
    /// job is then not counted as in flight.
    pub fn submit<F>(&self, work: F) -> StreamResult<()>
    where
        F: FnOnce() -> M + Send + 'static,
    {
        let job = self.next_job.fetch_add(1, Ordering::Relaxed);
        self.shared.state.lock().in_flight += 1;

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("{}-{job}", self.worker_name))
            .spawn(move || {
                let _guard = InFlightGuard {
                    shared: Arc::clone(&shared),
                };
                let message = work();
                shared.state.lock().ready.push_back(message);
            });

        match spawned {
            Ok(_detached) => {
                tracing::trace!(job, "job submitted");
                Ok(())
            }
            Err(e) => {
                self.shared.state.lock().in_flight -= 1;
                self.shared.settled.notify_all();
                tracing::error!(job, error = %e, "failed to spawn terrain worker");
                Err(StreamError::WorkerSpawn(e.to_string()))
            }
        }
    }

    /// Takes every queued message, oldest first.
    ///
    /// The queue lock is released before this returns.
    #[must_use]
    pub fn drain(&self) -> VecDeque<M> {
        std::mem::take(&mut self.shared.state.lock().ready)
    }

    /// Jobs still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.state.lock().in_flight
    }

    /// Messages waiting to be drained.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.state.lock().ready.len()
    }

    /// No job running and nothing waiting to be drained.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.in_flight == 0 && state.ready.is_empty()
    }

    /// Blocks until no job is running or `timeout` expires.
    ///
    /// Returns `true` if every job finished. Messages are left in the queue.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.in_flight > 0 {
            if self.shared.settled.wait_until(&mut state, deadline).timed_out() {
                return state.in_flight == 0;
            }
        }
        true
    }
}

impl JobRunner<Deferred> {
    /// Runs `work` in the background; `on_complete` gets its result later,
    /// on whichever thread calls [`JobRunner::run_completed`].
    ///
    /// # Errors
    ///
    /// See [`JobRunner::submit`].
    pub fn submit_callback<T, W, C>(&self, work: W, on_complete: C) -> StreamResult<()>
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        self.submit(move || {
            let result = work();
            Box::new(move || on_complete(result)) as Deferred
        })
    }

    /// Invokes every completed callback in arrival order, outside the lock.
    ///
    /// Returns how many ran.
    pub fn run_completed(&self) -> usize {
        let batch = self.drain();
        let count = batch.len();
        for callback in batch {
            callback();
        }
        count
    }
}

impl<M> std::fmt::Debug for JobRunner<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("JobRunner")
            .field("worker_name", &self.worker_name)
            .field("in_flight", &state.in_flight)
            .field("pending", &state.ready.len())
            .finish()
    }
}
