use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ingest::raw_event::{DropKind, PointerId, RawDropEvent, SensorAccuracy};

// Pointer lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

/// Pointer position in canonical pixel space
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerState {
    pub phase: PointerPhase,
    pub x: f32,
    pub y: f32,
}

impl PointerState {
    pub fn new(phase: PointerPhase, x: f32, y: f32) -> Self {
        Self { phase, x, y }
    }
}

/// Target orientation of every emitted pointer coordinate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Basis {
    /// Landscape rotated 90 degrees, reference edge on the right
    Landscape90,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateSpace {
    pub width_px: u32,
    pub height_px: u32,
    pub basis: Basis,
}

/// Snapshot of every active pointer at one point in time
///
/// `changed_ids` is always a subset of the keys of `pointers_by_id`. A
/// canceled frame carries no pointers and no changed ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerFrame {
    pub time_nanos: u64,
    pub pointers_by_id: BTreeMap<PointerId, PointerState>,
    pub changed_ids: Vec<PointerId>,
    pub canceled: bool,
    pub space: CoordinateSpace,
}

impl PointerFrame {
    pub fn pointer(&self, id: PointerId) -> Option<&PointerState> {
        self.pointers_by_id.get(&id)
    }

    pub fn phase_of(&self, id: PointerId) -> Option<PointerPhase> {
        self.pointer(id).map(|state| state.phase)
    }

    pub fn is_empty(&self) -> bool {
        self.pointers_by_id.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GyroFrame {
    pub time_nanos: u64,
    pub yaw_rate: f32,
    pub pitch_rate: f32,
    pub roll_rate: f32,
    pub accuracy: SensorAccuracy,
}

// Best-effort overflow report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropEvent {
    pub time_nanos: u64,
    pub kind: DropKind,
    pub dropped_count: u64,
}

impl From<&RawDropEvent> for DropEvent {
    fn from(raw: &RawDropEvent) -> Self {
        Self {
            time_nanos: raw.time_nanos,
            kind: raw.kind,
            dropped_count: raw.dropped_count,
        }
    }
}
