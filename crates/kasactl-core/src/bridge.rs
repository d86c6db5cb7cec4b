// ── Async bridge ──
//
// Vendor device calls are async; everything above the controller is
// synchronous request/response. The bridge owns the single execution
// context where backend futures run: a dedicated worker thread with a
// current-thread runtime, fed jobs over an mpsc queue in strict
// submission order. One context alive at a time -- the vendor library
// is not assumed reentrant.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use kasactl_backend::BackendError;

use crate::error::CoreError;

const QUEUE_DEPTH: usize = 32;

/// Extra wait on top of the op timeout before giving up on the worker's
/// reply. The worker enforces the real timeout; this only catches a
/// worker that died mid-job or a long queue ahead of the operation.
const REPLY_GRACE: Duration = Duration::from_secs(30);

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Serialized sync-to-async execution context.
pub(crate) struct Bridge {
    worker: Mutex<Option<Worker>>,
}

struct Worker {
    jobs: mpsc::Sender<Job>,
    thread: JoinHandle<()>,
}

impl Worker {
    fn spawn() -> Result<Self, CoreError> {
        // Build the runtime on the caller so a failure surfaces as a
        // typed error instead of a dead worker.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|err| CoreError::Backend {
                operation: "bridge",
                message: format!("failed to build bridge runtime: {err}"),
            })?;

        let (jobs, mut rx) = mpsc::channel::<Job>(QUEUE_DEPTH);
        let thread = std::thread::Builder::new()
            .name("kasactl-bridge".into())
            .spawn(move || {
                runtime.block_on(async move {
                    while let Some(job) = rx.recv().await {
                        job.await;
                    }
                });
                debug!("bridge worker drained");
            })
            .map_err(|err| CoreError::Backend {
                operation: "bridge",
                message: format!("failed to spawn bridge worker: {err}"),
            })?;

        Ok(Self { jobs, thread })
    }
}

impl Bridge {
    /// An idle bridge; the worker is spawned on first submission.
    pub(crate) fn new() -> Self {
        Self {
            worker: Mutex::new(None),
        }
    }

    /// Run one asynchronous backend operation to completion, blocking the
    /// calling thread.
    ///
    /// Operations execute in submission order on the single worker; the
    /// worker is created lazily and transparently recreated after a
    /// teardown. The future runs under `timeout`; exceeding it surfaces
    /// as [`CoreError::Timeout`], distinct from a backend-reported
    /// failure.
    pub(crate) fn run<T>(
        &self,
        operation: &'static str,
        timeout: Duration,
        fut: impl Future<Output = Result<T, BackendError>> + Send + 'static,
    ) -> Result<T, CoreError>
    where
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = std_mpsc::sync_channel::<Result<T, CoreError>>(1);
        let job: Job = Box::pin(async move {
            let outcome = match tokio::time::timeout(timeout, fut).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => {
                    warn!(operation, error = %err, "backend operation failed");
                    Err(CoreError::backend(operation, &err))
                }
                Err(_) => {
                    warn!(operation, ?timeout, "backend operation timed out");
                    Err(CoreError::Timeout { operation, timeout })
                }
            };
            let _ = reply_tx.send(outcome);
        });

        self.submit(job)?;

        match reply_rx.recv_timeout(timeout + REPLY_GRACE) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(CoreError::Timeout { operation, timeout }),
            Err(RecvTimeoutError::Disconnected) => Err(CoreError::Backend {
                operation,
                message: "bridge context torn down before the operation completed".into(),
            }),
        }
    }

    /// Queue a job, (re)spawning the worker if none is alive.
    fn submit(&self, job: Job) -> Result<(), CoreError> {
        let sender = {
            let mut guard = self.worker.lock().expect("bridge lock poisoned");
            if guard.as_ref().is_none_or(|w| w.jobs.is_closed()) {
                *guard = Some(Worker::spawn()?);
            }
            guard
                .as_ref()
                .map(|w| w.jobs.clone())
                .expect("worker just installed")
        };

        match sender.blocking_send(job) {
            Ok(()) => Ok(()),
            Err(send_err) => {
                // The worker died between the liveness check and the send;
                // spawn a fresh one and retry once.
                let job = send_err.0;
                let sender = {
                    let mut guard = self.worker.lock().expect("bridge lock poisoned");
                    *guard = Some(Worker::spawn()?);
                    guard
                        .as_ref()
                        .map(|w| w.jobs.clone())
                        .expect("worker just installed")
                };
                sender.blocking_send(job).map_err(|_| CoreError::Backend {
                    operation: "bridge",
                    message: "bridge worker unavailable".into(),
                })
            }
        }
    }

    /// Tear the worker down, letting queued work drain. Best-effort:
    /// failures are logged, never raised. The next submission recreates
    /// an idle context.
    pub(crate) fn shutdown(&self) {
        let worker = self.worker.lock().expect("bridge lock poisoned").take();
        if let Some(worker) = worker {
            drop(worker.jobs);
            if worker.thread.join().is_err() {
                warn!("bridge worker panicked during teardown");
            }
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn run_returns_the_operation_result() {
        let bridge = Bridge::new();
        let out = bridge
            .run("test", Duration::from_secs(1), async { Ok(41 + 1) })
            .unwrap();
        assert_eq!(out, 42);
    }

    #[test]
    fn backend_errors_are_wrapped() {
        let bridge = Bridge::new();
        let err = bridge
            .run("discover", Duration::from_secs(1), async {
                Err::<(), _>(BackendError::Discovery {
                    reason: "no interface".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Backend { operation: "discover", .. }));
    }

    #[test]
    fn slow_operations_surface_as_timeout_not_backend() {
        let bridge = Bridge::new();
        let err = bridge
            .run("refresh", Duration::from_millis(50), async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Timeout { operation: "refresh", .. }));
    }

    #[test]
    fn worker_is_recreated_after_shutdown() {
        let bridge = Bridge::new();
        assert_eq!(
            bridge
                .run("test", Duration::from_secs(1), async { Ok(1) })
                .unwrap(),
            1
        );
        bridge.shutdown();
        assert_eq!(
            bridge
                .run("test", Duration::from_secs(1), async { Ok(2) })
                .unwrap(),
            2
        );
    }

    #[test]
    fn operations_never_overlap() {
        let bridge = Arc::new(Bridge::new());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut threads = Vec::new();
        for _ in 0..4 {
            let bridge = Arc::clone(&bridge);
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            threads.push(std::thread::spawn(move || {
                bridge
                    .run("test", Duration::from_secs(5), async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap();
            }));
        }
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
