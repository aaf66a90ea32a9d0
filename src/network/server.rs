//! TCP Server
//!
//! Restores the queue, binds the listener and runs the three worker pools.

use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::Config;
use crate::dispatch::{DispatchWorker, Dispatcher, Scheduler};
use crate::error::{LineQueueError, Result};
use crate::storage::LineQueue;

use super::acceptor::Acceptor;
use super::multiplexer::Multiplexer;
use super::pool::WorkerPool;

/// Running pools, in stop order
struct Pools {
    acceptors: WorkerPool,
    multiplexers: WorkerPool,
    dispatchers: WorkerPool,
}

/// State shared between the server handle and the SHUTDOWN hook
struct Shared {
    config: Config,
    queue: Arc<LineQueue>,
    local_addr: SocketAddr,
    pools: Mutex<Option<Pools>>,
    stopped: Mutex<bool>,
    stopped_cv: Condvar,
}

impl Shared {
    /// Stop acceptors, then I/O loops, then dispatch workers.
    ///
    /// Returns false when the pools were already stopped by someone else.
    fn stop_pools(&self) -> bool {
        let Some(mut pools) = self.pools.lock().take() else {
            return false;
        };

        let grace = self.config.shutdown_grace();
        pools.acceptors.shutdown(grace);
        pools.multiplexers.shutdown(grace);
        pools.dispatchers.shutdown(grace);
        true
    }

    fn mark_stopped(&self) {
        *self.stopped.lock() = true;
        self.stopped_cv.notify_all();
    }

    fn stop(&self) {
        if self.stop_pools() {
            tracing::info!("Server stopped");
            self.mark_stopped();
        }
    }

    fn shutdown(&self) {
        if self.stop_pools() {
            if let Err(e) = self.queue.dump() {
                tracing::error!("Something went wrong during the dump: {}", e);
            }
            tracing::info!("Server shut down");
            self.mark_stopped();
        }
    }
}

/// LineQueue server
///
/// ## Threads
/// - `port-listener-N`: accept loops sharing the bound listener
/// - `read-write-socket-N`: I/O loops, each owning its own connections
/// - `command-executor-N`: dispatch workers pulling from the scheduler
pub struct Server {
    shared: Arc<Shared>,
}

impl Server {
    /// Restore the queue from its dump, bind and start serving.
    ///
    /// A failed restore aborts startup.
    pub fn start(config: Config) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(LineQueue::new(&config.dump_path));
        queue.restore()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            LineQueueError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        let local_addr = listener.local_addr()?;

        let shared = Arc::new(Shared {
            config: config.clone(),
            queue: Arc::clone(&queue),
            local_addr,
            pools: Mutex::new(None),
            stopped: Mutex::new(false),
            stopped_cv: Condvar::new(),
        });

        let scheduler = Arc::new(Scheduler::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&queue),
            shutdown_hook(Arc::downgrade(&shared)),
        ));

        let poll_timeout = config.poll_timeout();

        // Spawned in reverse stop order
        let workers = (0..config.dispatch_workers)
            .map(|_| {
                DispatchWorker::new(Arc::clone(&scheduler), Arc::clone(&dispatcher), poll_timeout)
            })
            .collect();
        let dispatchers = WorkerPool::spawn("command-executor", workers, Vec::new(), |worker, stop| {
            worker.run(stop)
        })?;

        let multiplexers = (0..config.io_workers)
            .map(|_| Multiplexer::new(Arc::clone(&scheduler), poll_timeout))
            .collect::<Result<Vec<_>>>()?;
        let handles: Vec<_> = multiplexers.iter().map(Multiplexer::handle).collect();
        let multiplexers = WorkerPool::spawn(
            "read-write-socket",
            multiplexers,
            handles.iter().map(|h| h.waker()).collect(),
            |multiplexer, stop| {
                if let Err(e) = multiplexer.run(stop) {
                    tracing::error!("Error during the handling read-write events: {}", e);
                }
            },
        )?;

        let mut acceptors = Vec::with_capacity(config.acceptor_workers);
        for _ in 0..config.acceptor_workers {
            acceptors.push(Acceptor::new(listener.try_clone()?, handles.clone(), poll_timeout)?);
        }
        let acceptor_wakers = acceptors.iter().map(Acceptor::waker).collect();
        let acceptors = WorkerPool::spawn("port-listener", acceptors, acceptor_wakers, |acceptor, stop| {
            if let Err(e) = acceptor.run(stop) {
                tracing::error!("Error during the handling incoming connections: {}", e);
            }
        })?;

        *shared.pools.lock() = Some(Pools {
            acceptors,
            multiplexers,
            dispatchers,
        });

        tracing::info!(
            "Server listening on {} ({} dispatch, {} I/O, {} acceptor workers)",
            local_addr,
            config.dispatch_workers,
            config.io_workers,
            config.acceptor_workers
        );

        Ok(Self { shared })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.shared.local_addr
    }

    /// The queue being served
    pub fn queue(&self) -> &Arc<LineQueue> {
        &self.shared.queue
    }

    /// Stop all pools without dumping the queue.
    ///
    /// Returns immediately if a SHUTDOWN is already stopping the server.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Stop all pools, then dump the queue
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    pub fn is_stopped(&self) -> bool {
        *self.shared.stopped.lock()
    }

    /// Block until the server has stopped
    pub fn wait(&self) {
        let mut stopped = self.shared.stopped.lock();
        while !*stopped {
            self.shared.stopped_cv.wait(&mut stopped);
        }
    }

    /// Block up to `timeout` for the server to stop; returns whether it did
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.shared.stopped.lock();
        while !*stopped {
            if self.shared.stopped_cv.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

/// SHUTDOWN runs the stop on its own thread so the dispatch worker issuing it
/// is free to drain and exit.
fn shutdown_hook(shared: Weak<Shared>) -> impl Fn() + Send + Sync + 'static {
    move || {
        let Some(shared) = shared.upgrade() else {
            return;
        };

        let spawned = thread::Builder::new()
            .name("shutdown".to_string())
            .spawn(move || shared.shutdown());

        if let Err(e) = spawned {
            tracing::error!("Failed to start shutdown: {}", e);
        }
    }
}
