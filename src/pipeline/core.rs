//! Single owner of all normalization state
//!
//! [`InputCore`] holds the metrics/rotation state, the pointer table and the
//! gyroscope normalizer. It is never shared directly: the synchronous pipeline
//! keeps it behind a mutex and the async worker owns it outright, so every raw
//! event is applied under one exclusive-access boundary.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ingest::raw_event::{RawEvent, RawWindowEvent, WindowEventKind};
use crate::normalize::diagnostics::{Anomaly, AnomalyCounts, Diagnostics};
use crate::normalize::frames::{DropEvent, PointerFrame};
use crate::normalize::gyro::GyroNormalizer;
use crate::normalize::pointer::{PointerNormalizer, PointerSettings, PointerStats};
use crate::normalize::rotation::MetricsState;

use super::sink::FrameSink;

// Core settings
#[derive(Clone, Debug)]
pub struct CoreSettings {
    pub pointer: PointerSettings,
    pub warn_interval: Duration,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            pointer: PointerSettings::default(),
            warn_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoreStats {
    pub events_dispatched: u64,
    pub pointer: PointerStats,
    pub gyro_frames: u64,
    pub drop_reports: u64,
    pub dropped_reported: u64,
    pub anomalies: AnomalyCounts,
}

#[derive(Debug)]
pub struct InputCore {
    metrics: MetricsState,
    pointer: PointerNormalizer,
    gyro: GyroNormalizer,
    diagnostics: Diagnostics,
    events_dispatched: u64,
    drop_reports: u64,
    dropped_reported: u64,
    last_event_ns: u64,
}

impl Default for InputCore {
    fn default() -> Self {
        Self::new(CoreSettings::default())
    }
}

impl InputCore {
    pub fn new(settings: CoreSettings) -> Self {
        Self {
            metrics: MetricsState::new(),
            pointer: PointerNormalizer::new(settings.pointer),
            gyro: GyroNormalizer::new(),
            diagnostics: Diagnostics::new(settings.warn_interval),
            events_dispatched: 0,
            drop_reports: 0,
            dropped_reported: 0,
            last_event_ns: 0,
        }
    }

    pub fn metrics(&self) -> &MetricsState {
        &self.metrics
    }

    /// Latest raw timestamp seen across all event kinds
    pub fn last_event_nanos(&self) -> u64 {
        self.last_event_ns
    }

    pub fn has_pending_move(&self) -> bool {
        self.pointer.has_pending_move()
    }

    pub fn has_active_pointers(&self) -> bool {
        !self.pointer.is_idle()
    }

    /// Applies one raw event, handing any resulting output to the sink
    ///
    /// Returns the number of outputs emitted.
    pub fn dispatch<S: FrameSink + ?Sized>(&mut self, event: RawEvent, sink: &mut S) -> usize {
        self.events_dispatched += 1;
        self.last_event_ns = self.last_event_ns.max(event.time_nanos());

        match event {
            RawEvent::Window(window) => self.handle_window(&window, sink),
            RawEvent::Pointer(pointer) => {
                let transform = self.metrics.transform_for(&pointer.display);
                match self.pointer.handle(&pointer, &transform, &mut self.diagnostics) {
                    Some(frame) => emit_pointer(sink, frame),
                    None => 0,
                }
            }
            RawEvent::Sensor(sensor) => {
                sink.on_gyro_frame(self.gyro.handle(&sensor));
                1
            }
            RawEvent::Drop(report) => {
                self.drop_reports += 1;
                self.dropped_reported += report.dropped_count;
                debug!(
                    "Forwarding drop report: {} {:?} events",
                    report.dropped_count, report.kind
                );
                sink.on_drop_event(DropEvent::from(&report));
                1
            }
        }
    }

    fn handle_window<S: FrameSink + ?Sized>(&mut self, event: &RawWindowEvent, sink: &mut S) -> usize {
        match event.kind {
            WindowEventKind::Attached => {
                self.metrics.attach(event.metrics);
                0
            }
            WindowEventKind::MetricsChanged => {
                self.metrics.update(event.metrics);
                0
            }
            WindowEventKind::Detached => {
                self.metrics.detach();
                match self.pointer.terminate(Some(event.time_nanos)) {
                    Some(frame) => emit_pointer(sink, frame),
                    None => 0,
                }
            }
            WindowEventKind::AttachFailed => {
                self.diagnostics.record(Anomaly::AttachFailed);
                0
            }
        }
    }

    /// Reports a coalesced MOVE that is still waiting for a follow-up event
    pub fn flush_pending_move<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        match self.pointer.flush_pending_move() {
            Some(frame) => emit_pointer(sink, frame),
            None => 0,
        }
    }

    /// Clears pointer state; a mid-gesture pointer gets a terminal canceled frame
    pub fn shutdown<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let emitted = match self.pointer.terminate(Some(self.last_event_ns)) {
            Some(frame) => {
                warn!("Shutting down mid-gesture, emitting terminal cancel frame");
                emit_pointer(sink, frame)
            }
            None => 0,
        };
        info!(
            "Input core shut down after {} events ({} anomalies)",
            self.events_dispatched,
            self.diagnostics.counts().total()
        );
        emitted
    }

    pub fn stats(&self) -> CoreStats {
        CoreStats {
            events_dispatched: self.events_dispatched,
            pointer: self.pointer.stats().clone(),
            gyro_frames: self.gyro.frames_emitted(),
            drop_reports: self.drop_reports,
            dropped_reported: self.dropped_reported,
            anomalies: self.diagnostics.counts().clone(),
        }
    }
}

fn emit_pointer<S: FrameSink + ?Sized>(sink: &mut S, frame: PointerFrame) -> usize {
    sink.on_pointer_frame(frame);
    1
}
