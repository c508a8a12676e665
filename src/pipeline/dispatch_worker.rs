use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use statum::{machine, state};
use tokio::sync::{mpsc, Notify};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::PipelineError;
use crate::ingest::backpressure::{BackpressureQueue, QueueStats};
use crate::ingest::raw_event::RawEvent;

use super::core::{CoreStats, InputCore};
use super::sink::NormalizedOutput;

// Dispatch worker settings
#[derive(Clone, Debug)]
pub struct WorkerSettings {
    pub max_batch: usize,
    pub idle_flush: Option<Duration>,
    pub stats_interval_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_batch: 256,
            idle_flush: None,
            stats_interval_secs: 30,
        }
    }
}

/// Final accounting returned when the worker stops
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub batches: u64,
    pub outputs_sent: u64,
    pub idle_flushes: u64,
    pub queue: QueueStats,
    pub core: CoreStats,
}

#[derive(Debug, Default)]
struct WorkerStats {
    batches: u64,
    outputs_sent: u64,
    idle_flushes: u64,
}

// Size of the batch held by the dispatching state
#[derive(Debug, Clone)]
pub struct EventBatch {
    pub len: usize,
}

#[state]
#[derive(Debug, Clone)]
pub enum DispatchState {
    Waiting,
    Dispatching(EventBatch),
}

#[machine]
pub struct DispatchWorker<S: DispatchState> {
    // Shared ingestion queue
    queue: Arc<BackpressureQueue>,

    // Signalled by producers after every accepted push
    wakeup: Arc<Notify>,

    // Exclusively owned normalization state
    core: InputCore,

    // Channel towards the mapping stage
    output_sender: mpsc::Sender<NormalizedOutput>,

    settings: WorkerSettings,

    // Events taken from the queue for the current batch; allocation is reused
    batch: Vec<RawEvent>,

    // Outputs produced by the core but not yet sent
    outbox: Vec<NormalizedOutput>,

    last_activity: Instant,

    stats: WorkerStats,
}

// Implementation of methods available in all states
impl<S: DispatchState> DispatchWorker<S> {
    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    // Send everything the core produced, in order; waits on a slow consumer
    async fn send_outbox(&mut self) -> Result<(), PipelineError> {
        for output in self.outbox.drain(..) {
            if self.output_sender.send(output).await.is_err() {
                error!("Output channel closed, stopping dispatch");
                return Err(PipelineError::OutputClosed);
            }
            self.stats.outputs_sent += 1;
        }
        Ok(())
    }

    fn report(&self) -> WorkerReport {
        WorkerReport {
            batches: self.stats.batches,
            outputs_sent: self.stats.outputs_sent,
            idle_flushes: self.stats.idle_flushes,
            queue: self.queue.stats(),
            core: self.core.stats(),
        }
    }
}

// Implementation for Waiting state
impl DispatchWorker<Waiting> {
    pub fn create(
        queue: Arc<BackpressureQueue>,
        wakeup: Arc<Notify>,
        core: InputCore,
        output_sender: mpsc::Sender<NormalizedOutput>,
        settings: WorkerSettings,
    ) -> Self {
        info!("Creating dispatch worker with settings: {:?}", settings);
        Self::new(
            queue,
            wakeup,
            core,
            output_sender,
            settings,
            Vec::new(),
            Vec::new(),
            Instant::now(),
            WorkerStats::default(),
        )
    }

    pub fn has_queued_events(&self) -> bool {
        !self.queue.is_empty()
    }

    // Take the next batch from the queue and move to Dispatching
    pub fn collect(mut self) -> DispatchWorker<Dispatching> {
        let len = self.queue.drain_into(&mut self.batch, self.settings.max_batch);
        debug!("Collected batch of {} raw events", len);
        self.transition_with(EventBatch { len })
    }

    /// Emits a pending coalesced MOVE after the configured input silence
    pub async fn flush_idle(&mut self) -> Result<(), PipelineError> {
        let Some(idle) = self.settings.idle_flush else {
            return Ok(());
        };
        if !self.core.has_pending_move() || self.last_activity.elapsed() < idle {
            return Ok(());
        }

        if self.core.flush_pending_move(&mut self.outbox) > 0 {
            self.stats.idle_flushes += 1;
            debug!("Idle flush emitted pending MOVE frame");
        }
        self.send_outbox().await
    }

    /// Drains what is left, reports residual drops and terminates open gestures
    pub async fn finish(mut self) -> Result<WorkerReport, PipelineError> {
        info!("Dispatch worker finishing, {} events still queued", self.queue.len());

        // Producers get `PushOutcome::Closed` from here on, so the drain below ends
        self.queue.close();

        while let Some(event) = self.queue.pop() {
            self.core.dispatch(event, &mut self.outbox);
        }
        self.queue.flush_drop_reports(self.core.last_event_nanos());
        while let Some(event) = self.queue.pop() {
            self.core.dispatch(event, &mut self.outbox);
        }
        self.core.shutdown(&mut self.outbox);
        self.send_outbox().await?;

        let report = self.report();
        info!(
            "Dispatch worker stopped: {} batches, {} outputs, {} events dropped",
            report.batches,
            report.outputs_sent,
            report.queue.dropped_sensor + report.queue.dropped_move
        );
        Ok(report)
    }
}

// Implementation for Dispatching state
impl DispatchWorker<Dispatching> {
    // Run the batch through the core and hand outputs to the consumer
    pub async fn dispatch(mut self) -> Result<DispatchWorker<Waiting>, PipelineError> {
        let len = self.get_state_data().map_or(0, |batch| batch.len);

        let mut events = std::mem::take(&mut self.batch);
        for event in events.drain(..) {
            self.core.dispatch(event, &mut self.outbox);
        }
        self.batch = events;
        debug!("Dispatched batch of {} raw events", len);
        self.stats.batches += 1;
        self.last_activity = Instant::now();
        self.send_outbox().await?;

        Ok(self.transition())
    }
}

/// Main worker loop
///
/// Wakes on producer notifications and dispatches one batch per pass, so
/// cancellation is observed between batches even while producers keep the
/// queue full. On cancellation it finishes cleanly so no pointer is left
/// without a terminal frame. On failure the queue is closed and emptied.
pub async fn run_dispatch_loop(
    worker: DispatchWorker<Waiting>,
    cancel: CancellationToken,
) -> Result<WorkerReport, PipelineError> {
    let queue = worker.queue.clone();
    let result = dispatch_until_cancelled(worker, cancel).await;
    if result.is_err() {
        queue.close();
        let discarded = queue.clear();
        warn!("Dispatch worker failed, discarded {} queued events", discarded);
    }
    result
}

async fn dispatch_until_cancelled(
    mut worker: DispatchWorker<Waiting>,
    cancel: CancellationToken,
) -> Result<WorkerReport, PipelineError> {
    let wakeup = worker.wakeup.clone();
    let idle_flush = worker.settings().idle_flush;
    let stats_interval = chrono::Duration::seconds(worker.settings().stats_interval_secs as i64);

    let mut idle_timer = tokio::time::interval(idle_flush.unwrap_or(Duration::from_secs(3600)));
    idle_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_stats_time = Local::now();
    let mut last_reported_outputs = 0;

    info!("Entering dispatch loop");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Dispatch loop cancelled");
                break;
            }
            _ = wakeup.notified() => {
                if worker.has_queued_events() {
                    worker = worker.collect().dispatch().await?;
                }
                // Come back for the rest after checking cancellation again
                if worker.has_queued_events() {
                    wakeup.notify_one();
                }
            }
            _ = idle_timer.tick(), if idle_flush.is_some() => {
                worker.flush_idle().await?;
            }
        }

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
            let outputs = worker.stats.outputs_sent - last_reported_outputs;
            let queue = worker.queue.stats();
            info!(
                "Dispatch stats: {} outputs in {} seconds ({:.1}/sec), queue len {}, dropped {} sensor / {} move",
                outputs,
                elapsed_seconds,
                outputs as f64 / elapsed_seconds as f64,
                worker.queue.len(),
                queue.dropped_sensor,
                queue.dropped_move
            );
            last_reported_outputs = worker.stats.outputs_sent;
            last_stats_time = now;
        }
    }

    worker.finish().await
}
