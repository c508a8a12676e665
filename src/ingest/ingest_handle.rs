use std::sync::Arc;

use tokio::sync::Notify;
use tracing::debug;

use super::backpressure::{BackpressureQueue, PushOutcome, QueueStats};
use super::raw_event::{RawEvent, RawPointerEvent, RawSensorEvent, RawWindowEvent};

/// Producer-side handle handed to platform callbacks
///
/// Cheap to clone and safe to use from any thread. Submitting never blocks:
/// the event is pushed through the backpressure policy and the consumer is
/// woken up.
#[derive(Clone, Debug)]
pub struct IngestHandle {
    queue: Arc<BackpressureQueue>,
    wakeup: Arc<Notify>,
}

impl IngestHandle {
    pub fn new(queue: Arc<BackpressureQueue>, wakeup: Arc<Notify>) -> Self {
        Self { queue, wakeup }
    }

    pub fn submit(&self, event: impl Into<RawEvent>) -> PushOutcome {
        let outcome = self.queue.push(event.into());
        match outcome {
            PushOutcome::Dropped => debug!("Raw event dropped at ingestion"),
            PushOutcome::Closed => debug!("Raw event rejected, pipeline is shut down"),
            _ => self.wakeup.notify_one(),
        }
        outcome
    }

    /// False once the consumer has shut down; submissions are rejected from then on
    pub fn is_open(&self) -> bool {
        !self.queue.is_closed()
    }

    pub fn submit_window(&self, event: RawWindowEvent) -> PushOutcome {
        self.submit(event)
    }

    pub fn submit_pointer(&self, event: RawPointerEvent) -> PushOutcome {
        self.submit(event)
    }

    pub fn submit_sensor(&self, event: RawSensorEvent) -> PushOutcome {
        self.submit(event)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub(crate) fn queue(&self) -> &Arc<BackpressureQueue> {
        &self.queue
    }
}
