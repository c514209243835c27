//! The data worker: runs pipeline jobs off the caller's task.
//!
//! Callers post a request and await exactly one reply. Jobs run one at a
//! time, in submission order, on tokio's blocking pool.

use std::sync::Arc;

use forecast_core::{Error, IngestOutput, IngestRequest, Result};
use parking_lot::Mutex;
use telemetry::metrics;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{pipeline, WorkerConfig};

struct Job {
    request: IngestRequest,
    reply: oneshot::Sender<IngestOutput>,
}

/// Counts a submission in the queue-depth gauge until it is answered or
/// abandoned.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        metrics().queue_depth.inc();
        Self
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        metrics().queue_depth.dec();
    }
}

type Handler = dyn Fn(IngestRequest, &WorkerConfig) -> IngestOutput + Send + Sync;

pub struct DataWorker;

impl DataWorker {
    /// Start a worker on the current tokio runtime.
    pub fn spawn(config: WorkerConfig) -> DataWorkerHandle {
        Self::spawn_with(config, Arc::new(pipeline::run))
    }

    pub(crate) fn spawn_with(config: WorkerConfig, handler: Arc<Handler>) -> DataWorkerHandle {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let task = tokio::spawn(serve(rx, Arc::new(config), handler));
        info!("Data worker started");

        DataWorkerHandle {
            tx,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }
}

async fn serve(mut rx: mpsc::Receiver<Job>, config: Arc<WorkerConfig>, handler: Arc<Handler>) {
    while let Some(Job { request, reply }) = rx.recv().await {
        let config = config.clone();
        let handler = handler.clone();

        let output = match tokio::task::spawn_blocking(move || handler(request, config.as_ref())).await {
            Ok(output) => output,
            Err(e) => {
                let reason = if e.is_panic() { "panicked" } else { "cancelled" };
                error!(reason = reason, "Pipeline run did not complete");
                pipeline::aborted(reason)
            }
        };

        if reply.send(output).is_err() {
            debug!("Submitter dropped before the result arrived");
        }
    }

    info!("Data worker stopped");
}

/// Cloneable handle to a running [`DataWorker`].
#[derive(Clone)]
pub struct DataWorkerHandle {
    tx: mpsc::Sender<Job>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl DataWorkerHandle {
    /// Submit a request and wait for its output.
    ///
    /// Returns `WORKER_001` if the worker is gone or is torn down before
    /// replying.
    pub async fn submit(&self, request: IngestRequest) -> Result<IngestOutput> {
        let _in_flight = InFlight::enter();
        let (reply, rx) = oneshot::channel();

        self.tx
            .send(Job { request, reply })
            .await
            .map_err(|_| Error::worker_unavailable("worker has stopped"))?;

        rx.await
            .map_err(|_| Error::worker_unavailable("worker terminated before replying"))
    }

    /// Tear the worker down. Queued and in-flight submissions fail with
    /// `WORKER_001`; a run already executing finishes but its result is
    /// discarded.
    pub fn terminate(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("Data worker terminated");
        }
    }

    /// Whether the worker no longer accepts requests.
    pub fn is_terminated(&self) -> bool {
        self.tx.is_closed() || self.task.lock().is_none()
    }
}
