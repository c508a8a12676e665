//! Pipeline Handle - async API around the ingestion queue and dispatch worker
//!
//! Spawns the dispatch worker on the current tokio runtime and hands out the
//! producer-side [`IngestHandle`]. Normalized output leaves through the
//! `mpsc::Sender` supplied by the caller.
//!

use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::ingest::backpressure::{BackpressureQueue, QueueSettings};
use crate::ingest::ingest_handle::IngestHandle;

use super::core::{CoreSettings, InputCore};
use super::dispatch_worker::{run_dispatch_loop, DispatchWorker, WorkerReport, WorkerSettings};
use super::sink::NormalizedOutput;

/// Configuration for the complete pipeline
///
/// Distributed to the queue, the normalization core and the worker on spawn.
#[derive(Clone, Debug, Default)]
pub struct PipelineSettings {
    pub queue: QueueSettings,
    pub core: CoreSettings,
    pub worker: WorkerSettings,
}

/// Handle for managing the pipeline lifecycle
///
/// # Threading Model
///
/// ```text
/// producers ─[RawEvent]→ BackpressureQueue ─[Notify]→ DispatchWorker ─[NormalizedOutput]→ consumer
///  (any thread)          (never blocks)                (owns InputCore)  (provided sender)
/// ```
///
/// Dropping the handle cancels the worker; call [`PipelineHandle::shutdown`]
/// to wait for the terminal frames and the final report.
pub struct PipelineHandle {
    ingest: IngestHandle,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<WorkerReport, PipelineError>>>,
}

impl PipelineHandle {
    /// Spawns the dispatch worker on the current runtime
    ///
    /// # Errors
    ///
    /// * [`PipelineError::NoRuntime`] - called outside a tokio runtime
    pub fn spawn(
        settings: Option<PipelineSettings>,
        sender: mpsc::Sender<NormalizedOutput>,
    ) -> Result<Self, PipelineError> {
        info!("Initializing input pipeline with settings: {:?}", settings);

        let settings = settings.unwrap_or_default();
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PipelineError::NoRuntime(e.to_string()))?;

        let queue = Arc::new(BackpressureQueue::new(settings.queue));
        let wakeup = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        debug!(
            "Created ingestion queue with capacity {}",
            queue.settings().capacity
        );

        let worker = DispatchWorker::create(
            queue.clone(),
            wakeup.clone(),
            InputCore::new(settings.core),
            sender,
            settings.worker,
        );

        let loop_cancel = cancel.clone();
        let task = runtime.spawn(async move {
            let result = run_dispatch_loop(worker, loop_cancel).await;
            if let Err(e) = &result {
                error!("Dispatch worker stopped with error: {}", e);
            }
            result
        });

        info!("Input pipeline spawned successfully");
        Ok(Self {
            ingest: IngestHandle::new(queue, wakeup),
            cancel,
            task: Some(task),
        })
    }

    /// Validates the config and spawns with the settings it describes
    pub fn from_config(
        config: &PipelineConfig,
        sender: mpsc::Sender<NormalizedOutput>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Self::spawn(Some(config.pipeline_settings()), sender)
    }

    pub fn ingest(&self) -> IngestHandle {
        self.ingest.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the worker after it has drained the queue and terminated open gestures
    pub async fn shutdown(&mut self) -> Result<WorkerReport, PipelineError> {
        let task = self.task.take().ok_or(PipelineError::AlreadyShutDown)?;
        info!("Shutting down input pipeline");
        self.cancel.cancel();

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!("Dispatch worker join failed: {}", e);
                Err(PipelineError::WorkerJoin(e.to_string()))
            }
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            warn!("Pipeline handle dropped without shutdown, cancelling worker");
        }
        self.cancel.cancel();
    }
}
