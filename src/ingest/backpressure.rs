//! Bounded FIFO ingestion queue with selective eviction
//!
//! Producers push from arbitrary platform threads without ever blocking. When
//! the queue is at capacity, droppable events (sensor samples, pointer MOVE)
//! are discarded and counted, while critical events evict the oldest droppable
//! entry. If no droppable entry is left to evict, a critical event is still
//! admitted and the queue grows past its nominal capacity.
//!
//! ```text
//! push(Droppable) ──► full? ──yes──► drop + count ──► every N drops: RawDropEvent
//!                        └─no──► enqueue
//! push(Critical)  ──► full? ──yes──► evict oldest droppable (or grow) ──► enqueue
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use super::raw_event::{DropKind, Priority, RawDropEvent, RawEvent};

// Queue settings
#[derive(Clone, Debug)]
pub struct QueueSettings {
    pub capacity: usize,
    pub drop_report_batch: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: 4096,
            drop_report_batch: 100,
        }
    }
}

/// Result of a single non-blocking push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Event enqueued without touching other entries
    Accepted,
    /// Critical event enqueued after evicting droppable entries
    AcceptedWithEviction { evicted: usize },
    /// Critical event enqueued past capacity because only critical entries were queued
    AcceptedOverCapacity,
    /// Droppable event discarded because the queue was full
    Dropped,
    /// Queue closed by its consumer; nothing is enqueued anymore
    Closed,
}

impl PushOutcome {
    pub fn is_accepted(self) -> bool {
        !matches!(self, PushOutcome::Dropped | PushOutcome::Closed)
    }
}

/// Cumulative queue counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub accepted: u64,
    pub dropped_sensor: u64,
    pub dropped_move: u64,
    pub evicted: u64,
    pub over_capacity_admissions: u64,
    pub drop_reports: u64,
    pub peak_len: usize,
    pub rejected_closed: u64,
}

#[derive(Debug, Default)]
struct DropCounters {
    sensor: u64,
    pointer_move: u64,
}

impl DropCounters {
    fn slot(&mut self, kind: DropKind) -> &mut u64 {
        match kind {
            DropKind::Sensor => &mut self.sensor,
            DropKind::PointerMove => &mut self.pointer_move,
        }
    }
}

#[derive(Debug)]
struct QueueInner {
    entries: VecDeque<RawEvent>,
    // Drops not yet reported through a RawDropEvent
    unreported: DropCounters,
    stats: QueueStats,
    closed: bool,
}

#[derive(Debug)]
pub struct BackpressureQueue {
    settings: QueueSettings,
    inner: Mutex<QueueInner>,
}

impl BackpressureQueue {
    pub fn new(settings: QueueSettings) -> Self {
        let capacity = settings.capacity.max(1);
        debug!(
            "Creating backpressure queue: capacity={}, drop_report_batch={}",
            capacity, settings.drop_report_batch
        );
        Self {
            settings: QueueSettings {
                capacity,
                drop_report_batch: settings.drop_report_batch.max(1),
            },
            inner: Mutex::new(QueueInner {
                entries: VecDeque::with_capacity(capacity),
                unreported: DropCounters::default(),
                stats: QueueStats::default(),
                closed: false,
            }),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(QueueSettings {
            capacity,
            ..QueueSettings::default()
        })
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    // A panicking producer must not wedge every other producer
    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues an event according to the overflow policy; never blocks on capacity
    pub fn push(&self, event: RawEvent) -> PushOutcome {
        let capacity = self.settings.capacity;
        let mut inner = self.lock();

        if inner.closed {
            inner.stats.rejected_closed += 1;
            return PushOutcome::Closed;
        }

        if inner.entries.len() < capacity {
            inner.entries.push_back(event);
            return inner.admitted(PushOutcome::Accepted);
        }

        match event.priority() {
            Priority::Droppable(kind) => {
                let time_nanos = event.time_nanos();
                inner.record_drop(kind, 1, time_nanos, self.settings.drop_report_batch);
                PushOutcome::Dropped
            }
            Priority::Critical => {
                let time_nanos = event.time_nanos();
                let mut evicted = 0;
                while inner.entries.len() >= capacity {
                    let Some(index) = inner.entries.iter().position(|e| !e.is_critical()) else {
                        break;
                    };
                    if let Some(Priority::Droppable(kind)) =
                        inner.entries.remove(index).map(|e| e.priority())
                    {
                        inner.stats.evicted += 1;
                        inner.record_drop(kind, 1, time_nanos, self.settings.drop_report_batch);
                        evicted += 1;
                    }
                }

                let over_capacity = inner.entries.len() >= capacity;
                inner.entries.push_back(event);

                if over_capacity {
                    inner.stats.over_capacity_admissions += 1;
                    warn!(
                        "Queue holds only critical events, growing to {} (capacity {})",
                        inner.entries.len(),
                        capacity
                    );
                    inner.admitted(PushOutcome::AcceptedOverCapacity)
                } else {
                    debug!("Evicted {} droppable events for critical event", evicted);
                    inner.admitted(PushOutcome::AcceptedWithEviction { evicted })
                }
            }
        }
    }

    pub fn pop(&self) -> Option<RawEvent> {
        self.lock().entries.pop_front()
    }

    /// Removes up to `max` events in FIFO order
    pub fn drain(&self, max: usize) -> Vec<RawEvent> {
        let mut inner = self.lock();
        let count = max.min(inner.entries.len());
        inner.entries.drain(..count).collect()
    }

    /// Moves up to `max` events into `out`, reusing its allocation
    pub fn drain_into(&self, out: &mut Vec<RawEvent>, max: usize) -> usize {
        let mut inner = self.lock();
        let count = max.min(inner.entries.len());
        out.extend(inner.entries.drain(..count));
        count
    }

    /// Stops accepting pushes; already queued events stay poppable
    pub fn close(&self) {
        let mut inner = self.lock();
        if !inner.closed {
            debug!("Closing queue with {} events pending", inner.entries.len());
            inner.closed = true;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Reports drops that have not yet reached a full batch
    ///
    /// Used on shutdown so the last partial batch is not silently lost.
    /// Returns the number of drop reports enqueued.
    pub fn flush_drop_reports(&self, time_nanos: u64) -> usize {
        let mut inner = self.lock();
        let mut flushed = 0;
        for kind in [DropKind::Sensor, DropKind::PointerMove] {
            let pending = std::mem::take(inner.unreported.slot(kind));
            if pending > 0 {
                inner.enqueue_drop_report(kind, pending, time_nanos);
                flushed += 1;
            }
        }
        flushed
    }

    /// Empties the queue, returning how many events were discarded
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let discarded = inner.entries.len();
        inner.entries.clear();
        inner.unreported = DropCounters::default();
        discarded
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        self.lock().stats.clone()
    }
}

impl QueueInner {
    fn admitted(&mut self, outcome: PushOutcome) -> PushOutcome {
        self.stats.accepted += 1;
        self.stats.peak_len = self.stats.peak_len.max(self.entries.len());
        outcome
    }

    fn record_drop(&mut self, kind: DropKind, count: u64, time_nanos: u64, batch: u64) {
        match kind {
            DropKind::Sensor => self.stats.dropped_sensor += count,
            DropKind::PointerMove => self.stats.dropped_move += count,
        }

        let slot = self.unreported.slot(kind);
        *slot += count;
        if *slot >= batch {
            let pending = std::mem::take(slot);
            self.enqueue_drop_report(kind, pending, time_nanos);
        }
    }

    // Merges into a still-queued report of the same kind, else appends one past capacity
    fn enqueue_drop_report(&mut self, kind: DropKind, count: u64, time_nanos: u64) {
        let queued = self.entries.iter_mut().rev().find_map(|e| match e {
            RawEvent::Drop(report) if report.kind == kind => Some(report),
            _ => None,
        });

        match queued {
            Some(report) => {
                report.dropped_count += count;
                debug!(
                    "Merged {} {:?} drops into queued report (total {})",
                    count, kind, report.dropped_count
                );
            }
            None => {
                warn!("Queue overflow: {} {:?} events dropped", count, kind);
                self.entries.push_back(RawEvent::Drop(RawDropEvent {
                    time_nanos,
                    kind,
                    dropped_count: count,
                }));
                self.stats.drop_reports += 1;
                self.stats.peak_len = self.stats.peak_len.max(self.entries.len());
            }
        }
    }
}
