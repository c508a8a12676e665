use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, info};

use crate::ingest::backpressure::{BackpressureQueue, PushOutcome, QueueSettings, QueueStats};
use crate::ingest::ingest_handle::IngestHandle;
use crate::ingest::raw_event::RawEvent;

use super::core::{CoreSettings, CoreStats, InputCore};
use super::sink::FrameSink;

/// Queue and core wired together without any runtime
///
/// Producers submit from any thread; whoever calls [`InputPipeline::pump`]
/// drains the queue into the core while holding the core's lock, so outputs
/// leave in the exact order events were accepted even with several pumpers.
#[derive(Debug)]
pub struct InputPipeline {
    ingest: IngestHandle,
    core: Mutex<InputCore>,
}

impl Default for InputPipeline {
    fn default() -> Self {
        Self::new(QueueSettings::default(), CoreSettings::default())
    }
}

impl InputPipeline {
    pub fn new(queue: QueueSettings, core: CoreSettings) -> Self {
        let queue = Arc::new(BackpressureQueue::new(queue));
        Self {
            ingest: IngestHandle::new(queue, Arc::new(Notify::new())),
            core: Mutex::new(InputCore::new(core)),
        }
    }

    pub fn ingest(&self) -> IngestHandle {
        self.ingest.clone()
    }

    pub fn submit(&self, event: impl Into<RawEvent>) -> PushOutcome {
        self.ingest.submit(event)
    }

    fn lock_core(&self) -> MutexGuard<'_, InputCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dispatches every queued event, returning the number of outputs emitted
    pub fn pump<S: FrameSink + ?Sized>(&self, sink: &mut S) -> usize {
        let mut core = self.lock_core();
        let queue = self.ingest.queue();
        let mut emitted = 0;
        while let Some(event) = queue.pop() {
            emitted += core.dispatch(event, sink);
        }
        if emitted > 0 {
            debug!("Pumped {} outputs", emitted);
        }
        emitted
    }

    /// Emits a coalesced MOVE still waiting for a follow-up event
    pub fn flush_pending_move<S: FrameSink + ?Sized>(&self, sink: &mut S) -> usize {
        self.lock_core().flush_pending_move(sink)
    }

    /// Drains the queue, reports residual drops and terminates open gestures
    ///
    /// Submissions made after this call are rejected with [`PushOutcome::Closed`].
    pub fn shutdown<S: FrameSink + ?Sized>(&self, sink: &mut S) -> usize {
        self.ingest.queue().close();
        let mut emitted = self.pump(sink);
        let mut core = self.lock_core();
        let queue = self.ingest.queue();

        queue.flush_drop_reports(core.last_event_nanos());
        while let Some(event) = queue.pop() {
            emitted += core.dispatch(event, sink);
        }
        emitted += core.shutdown(sink);
        info!("Input pipeline shut down");
        emitted
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.ingest.queue_stats()
    }

    pub fn core_stats(&self) -> CoreStats {
        self.lock_core().stats()
    }
}
