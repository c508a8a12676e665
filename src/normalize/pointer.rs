//! Pointer state machine with MOVE coalescing
//!
//! Each pointer id moves through `absent -> Down -> Move* -> Up -> absent`.
//! A CANCEL clears every id at once. DOWN, UP and CANCEL always produce a
//! frame immediately; MOVE updates the table right away but only produces a
//! frame once the configured interval has elapsed since the last MOVE-driven
//! frame, so a burst collapses into the latest positions.
//!
//! Eligibility is checked when the next event arrives. A pending MOVE can also
//! be pushed out explicitly with [`PointerNormalizer::flush_pending_move`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::ingest::raw_event::{PointerAction, PointerId, RawPointerEvent};

use super::diagnostics::{Anomaly, Diagnostics};
use super::frames::{CoordinateSpace, PointerFrame, PointerPhase, PointerState};
use super::rotation::CanonicalTransform;

pub const DEFAULT_MOVE_INTERVAL_NS: u64 = 1_000_000_000 / 60;

// Pointer normalizer settings
#[derive(Clone, Debug)]
pub struct PointerSettings {
    pub move_interval_ns: u64,
}

impl Default for PointerSettings {
    fn default() -> Self {
        Self {
            move_interval_ns: DEFAULT_MOVE_INTERVAL_NS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PointerStats {
    pub frames_emitted: u64,
    pub moves_applied: u64,
    pub moves_coalesced: u64,
    pub cancels_synthesized: u64,
}

#[derive(Debug)]
pub struct PointerNormalizer {
    settings: PointerSettings,

    // Active pointers in canonical space
    active: BTreeMap<PointerId, PointerState>,

    // Ids touched since the last emitted frame
    pending_changed: BTreeSet<PointerId>,

    // MOVE updates applied but not yet reported
    pending_move: bool,
    last_move_emit_ns: Option<u64>,
    last_move_ns: u64,

    last_frame_ns: Option<u64>,
    last_space: Option<CoordinateSpace>,

    // Set by CANCEL, cleared by the next DOWN
    canceled: bool,

    stats: PointerStats,
}

impl Default for PointerNormalizer {
    fn default() -> Self {
        Self::new(PointerSettings::default())
    }
}

impl PointerNormalizer {
    pub fn new(settings: PointerSettings) -> Self {
        debug!(
            "Creating pointer normalizer with {}ns move interval",
            settings.move_interval_ns
        );
        Self {
            settings,
            active: BTreeMap::new(),
            pending_changed: BTreeSet::new(),
            pending_move: false,
            last_move_emit_ns: None,
            last_move_ns: 0,
            last_frame_ns: None,
            last_space: None,
            canceled: false,
            stats: PointerStats::default(),
        }
    }

    pub fn settings(&self) -> &PointerSettings {
        &self.settings
    }

    pub fn stats(&self) -> &PointerStats {
        &self.stats
    }

    pub fn active_ids(&self) -> impl Iterator<Item = PointerId> + '_ {
        self.active.keys().copied()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub fn has_pending_move(&self) -> bool {
        self.pending_move
    }

    /// Applies one raw pointer event and returns the frame it triggers, if any
    pub fn handle(
        &mut self,
        event: &RawPointerEvent,
        transform: &CanonicalTransform,
        diagnostics: &mut Diagnostics,
    ) -> Option<PointerFrame> {
        let time_nanos = self.frame_time(event.time_nanos, Some(&mut *diagnostics));
        let space = transform.space();
        self.last_space = Some(space);

        match event.action {
            PointerAction::Down => self.handle_down(event, time_nanos, transform, diagnostics),
            PointerAction::Move => self.handle_move(event, time_nanos, transform, diagnostics),
            PointerAction::Up => self.handle_up(event, time_nanos, transform, diagnostics),
            PointerAction::Cancel => Some(self.cancel(time_nanos, space)),
        }
    }

    fn handle_down(
        &mut self,
        event: &RawPointerEvent,
        time_nanos: u64,
        transform: &CanonicalTransform,
        diagnostics: &mut Diagnostics,
    ) -> Option<PointerFrame> {
        let id = event.changed_id;
        self.canceled = false;

        // A DOWN always yields a frame; without the changed sample only the
        // other listed pointers are refreshed
        match event.pointer(id) {
            Some(pointer) => {
                if self.active.contains_key(&id) {
                    diagnostics.record(Anomaly::DuplicateDown { id });
                }
                let (x, y) = transform.apply(pointer.x, pointer.y);
                self.active.insert(id, PointerState::new(PointerPhase::Down, x, y));
                self.pending_changed.insert(id);
                debug!("Pointer {} down at ({:.1}, {:.1})", id, x, y);
            }
            None => diagnostics.record(Anomaly::MissingChangedPointer {
                action: PointerAction::Down,
                id,
            }),
        }
        self.refresh_others(event, transform);

        self.pending_move = false;
        Some(self.emit(time_nanos, transform.space(), false))
    }

    fn handle_move(
        &mut self,
        event: &RawPointerEvent,
        time_nanos: u64,
        transform: &CanonicalTransform,
        diagnostics: &mut Diagnostics,
    ) -> Option<PointerFrame> {
        if self.active.is_empty() && self.canceled {
            diagnostics.record(Anomaly::InputAfterCancel {
                action: PointerAction::Move,
            });
            return None;
        }

        let mut updated = false;
        for pointer in &event.pointers {
            match self.active.get_mut(&pointer.id) {
                Some(state) => {
                    let (x, y) = transform.apply(pointer.x, pointer.y);
                    state.phase = PointerPhase::Move;
                    state.x = x;
                    state.y = y;
                    self.pending_changed.insert(pointer.id);
                    updated = true;
                }
                None => diagnostics.record(Anomaly::UnknownPointer {
                    action: PointerAction::Move,
                    id: pointer.id,
                }),
            }
        }

        if updated {
            self.stats.moves_applied += 1;
            self.pending_move = true;
            self.last_move_ns = time_nanos;
        }

        if self.pending_move && self.move_interval_elapsed(time_nanos) {
            self.last_move_emit_ns = Some(time_nanos);
            self.pending_move = false;
            return Some(self.emit(time_nanos, transform.space(), false));
        }

        if updated {
            self.stats.moves_coalesced += 1;
        }
        None
    }

    fn handle_up(
        &mut self,
        event: &RawPointerEvent,
        time_nanos: u64,
        transform: &CanonicalTransform,
        diagnostics: &mut Diagnostics,
    ) -> Option<PointerFrame> {
        let id = event.changed_id;
        if !self.active.contains_key(&id) {
            let anomaly = if self.canceled && self.active.is_empty() {
                Anomaly::InputAfterCancel {
                    action: PointerAction::Up,
                }
            } else {
                Anomaly::UnknownPointer {
                    action: PointerAction::Up,
                    id,
                }
            };
            diagnostics.record(anomaly);
            return None;
        }

        let position = event.pointer(id).map(|p| transform.apply(p.x, p.y));
        if position.is_none() {
            // Terminate anyway with the last known position
            diagnostics.record(Anomaly::MissingChangedPointer {
                action: PointerAction::Up,
                id,
            });
        }
        if let Some(state) = self.active.get_mut(&id) {
            state.phase = PointerPhase::Up;
            if let Some((x, y)) = position {
                state.x = x;
                state.y = y;
            }
        }
        self.pending_changed.insert(id);
        self.refresh_others(event, transform);

        debug!("Pointer {} up", id);
        self.pending_move = false;
        Some(self.emit(time_nanos, transform.space(), false))
    }

    fn cancel(&mut self, time_nanos: u64, space: CoordinateSpace) -> PointerFrame {
        debug!("Pointer cancel, clearing {} active pointers", self.active.len());
        self.active.clear();
        self.pending_changed.clear();
        self.pending_move = false;
        self.canceled = true;
        self.emit(time_nanos, space, true)
    }

    /// Emits a coalesced MOVE that has not been reported yet
    ///
    /// The frame is stamped with the time of the latest applied MOVE.
    pub fn flush_pending_move(&mut self) -> Option<PointerFrame> {
        if !self.pending_move || self.active.is_empty() {
            return None;
        }
        let space = self.last_space?;
        let time_nanos = self.frame_time(self.last_move_ns, None);
        self.last_move_emit_ns = Some(time_nanos);
        self.pending_move = false;
        debug!("Flushing idle pending MOVE");
        Some(self.emit(time_nanos, space, false))
    }

    /// Clears all pointer state, synthesizing a canceled frame when mid-gesture
    ///
    /// Used on surface detach and shutdown so no consumer is left holding a
    /// pointer in DOWN or MOVE without a terminal frame.
    pub fn terminate(&mut self, time_hint: Option<u64>) -> Option<PointerFrame> {
        if self.active.is_empty() {
            self.pending_changed.clear();
            self.pending_move = false;
            return None;
        }
        let space = self.last_space?;
        let time_nanos = self.frame_time(time_hint.unwrap_or(0), None);
        self.stats.cancels_synthesized += 1;
        debug!(
            "Synthesizing cancel for {} active pointers",
            self.active.len()
        );
        Some(self.cancel(time_nanos, space))
    }

    fn move_interval_elapsed(&self, time_nanos: u64) -> bool {
        match self.last_move_emit_ns {
            Some(last) => time_nanos.saturating_sub(last) >= self.settings.move_interval_ns,
            None => true,
        }
    }

    // Keep frame timestamps non-decreasing
    fn frame_time(&self, received: u64, diagnostics: Option<&mut Diagnostics>) -> u64 {
        match self.last_frame_ns {
            Some(previous) if received < previous => {
                if let Some(diagnostics) = diagnostics {
                    diagnostics.record(Anomaly::ClockRegression { previous, received });
                }
                previous
            }
            _ => received,
        }
    }

    // Positions of other listed pointers, without marking them changed
    fn refresh_others(&mut self, event: &RawPointerEvent, transform: &CanonicalTransform) {
        for pointer in event.pointers.iter().filter(|p| p.id != event.changed_id) {
            if let Some(state) = self.active.get_mut(&pointer.id) {
                let (x, y) = transform.apply(pointer.x, pointer.y);
                state.x = x;
                state.y = y;
            }
        }
    }

    fn emit(&mut self, time_nanos: u64, space: CoordinateSpace, canceled: bool) -> PointerFrame {
        let frame = PointerFrame {
            time_nanos,
            pointers_by_id: self.active.clone(),
            changed_ids: self
                .pending_changed
                .iter()
                .copied()
                .filter(|id| self.active.contains_key(id))
                .collect(),
            canceled,
            space,
        };

        self.active.retain(|_, state| state.phase != PointerPhase::Up);
        self.pending_changed.clear();
        self.last_frame_ns = Some(time_nanos);
        self.stats.frames_emitted += 1;
        frame
    }
}
