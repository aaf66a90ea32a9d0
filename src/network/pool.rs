//! Worker pools
//!
//! Named threads sharing a stop flag, stopped with a bounded grace period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use mio::Waker;

use crate::error::Result;

/// Sends an exit notice when a worker thread ends, panics included
struct ExitSignal(Sender<()>);

impl Drop for ExitSignal {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

/// A fixed set of threads running one task each
pub struct WorkerPool {
    name: String,

    /// Raised on shutdown; workers poll it between blocking waits
    stop: Arc<AtomicBool>,

    /// Break blocked readiness waits on shutdown
    wakers: Vec<Arc<Waker>>,

    workers: Vec<JoinHandle<()>>,
    exits: Receiver<()>,
}

impl WorkerPool {
    /// Spawn one thread per task, named `<name>-<index>`
    pub fn spawn<T, F>(name: &str, tasks: Vec<T>, wakers: Vec<Arc<Waker>>, run: F) -> Result<Self>
    where
        T: Send + 'static,
        F: Fn(T, &AtomicBool) + Send + Sync + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let run = Arc::new(run);
        let (exit_tx, exits) = channel::unbounded();

        let mut pool = Self {
            name: name.to_string(),
            stop: Arc::clone(&stop),
            wakers,
            workers: Vec::with_capacity(tasks.len()),
            exits,
        };

        for (index, task) in tasks.into_iter().enumerate() {
            let stop = Arc::clone(&stop);
            let run = Arc::clone(&run);
            let signal = ExitSignal(exit_tx.clone());

            let spawned = thread::Builder::new()
                .name(format!("{}-{}", name, index))
                .spawn(move || {
                    let _signal = signal;
                    run(task, &stop);
                });

            match spawned {
                Ok(handle) => pool.workers.push(handle),
                Err(e) => {
                    // Stop whatever already started before reporting
                    pool.shutdown(Duration::from_secs(1));
                    return Err(e.into());
                }
            }
        }

        Ok(pool)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Raise the stop flag, wake blocked workers and wait up to `grace` for
    /// them to exit. Workers still running afterwards are detached.
    pub fn shutdown(&mut self, grace: Duration) {
        self.stop.store(true, Ordering::Release);

        for waker in &self.wakers {
            if let Err(e) = waker.wake() {
                tracing::debug!("Failed to wake {} worker: {}", self.name, e);
            }
        }

        let deadline = Instant::now() + grace;
        let mut exited = 0;
        while exited < self.workers.len() {
            match self.exits.recv_deadline(deadline) {
                Ok(()) => exited += 1,
                Err(_) => break,
            }
        }

        if exited < self.workers.len() {
            tracing::error!(
                "{} of {} {} workers did not stop within {:?}",
                self.workers.len() - exited,
                self.workers.len(),
                self.name,
                grace
            );
        }

        for handle in self.workers.drain(..) {
            if !handle.is_finished() {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("A {} worker panicked", self.name);
            }
        }

        tracing::info!("Worker pool {} stopped", self.name);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown(Duration::from_secs(1));
        }
    }
}
