use serde::{Deserialize, Serialize};

/// Pointer identifier as assigned by the platform touch stack
pub type PointerId = i32;

// Raw event family produced by the platform binding layer
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    Window(RawWindowEvent),
    Pointer(RawPointerEvent),
    Sensor(RawSensorEvent),
    Drop(RawDropEvent),
}

/// Queue priority of a raw event
///
/// Critical events are never dropped or evicted by the backpressure queue.
/// Droppable events carry the [`DropKind`] they are accounted under when lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Critical,
    Droppable(DropKind),
}

impl RawEvent {
    pub fn time_nanos(&self) -> u64 {
        match self {
            RawEvent::Window(e) => e.time_nanos,
            RawEvent::Pointer(e) => e.time_nanos,
            RawEvent::Sensor(e) => e.time_nanos,
            RawEvent::Drop(e) => e.time_nanos,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            RawEvent::Pointer(e) if e.action == PointerAction::Move => {
                Priority::Droppable(DropKind::PointerMove)
            }
            RawEvent::Sensor(_) => Priority::Droppable(DropKind::Sensor),
            // Pointer lifecycle, window metrics and drop reports
            RawEvent::Pointer(_) | RawEvent::Window(_) | RawEvent::Drop(_) => Priority::Critical,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.priority() == Priority::Critical
    }
}

impl From<RawWindowEvent> for RawEvent {
    fn from(event: RawWindowEvent) -> Self {
        RawEvent::Window(event)
    }
}

impl From<RawPointerEvent> for RawEvent {
    fn from(event: RawPointerEvent) -> Self {
        RawEvent::Pointer(event)
    }
}

impl From<RawSensorEvent> for RawEvent {
    fn from(event: RawSensorEvent) -> Self {
        RawEvent::Sensor(event)
    }
}

impl From<RawDropEvent> for RawEvent {
    fn from(event: RawDropEvent) -> Self {
        RawEvent::Drop(event)
    }
}

// Window lifecycle kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowEventKind {
    Attached,
    Detached,
    MetricsChanged,
    AttachFailed,
}

/// Display rotation relative to the device's natural orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    /// Natural portrait
    Rotation0,
    /// Landscape
    Rotation90,
    /// Upside-down portrait
    Rotation180,
    /// Reverse landscape
    Rotation270,
}

impl Rotation {
    /// Maps the platform's surface rotation index (0..=3)
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Rotation::Rotation0),
            1 => Some(Rotation::Rotation90),
            2 => Some(Rotation::Rotation180),
            3 => Some(Rotation::Rotation270),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Rotation::Rotation0 => 0,
            Rotation::Rotation90 => 1,
            Rotation::Rotation180 => 2,
            Rotation::Rotation270 => 3,
        }
    }
}

// Display geometry snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    pub width_px: u32,
    pub height_px: u32,
    pub density_dpi: u32,
    pub rotation: Rotation,
}

impl DisplayMetrics {
    pub fn new(width_px: u32, height_px: u32, density_dpi: u32, rotation: Rotation) -> Self {
        Self {
            width_px,
            height_px,
            density_dpi,
            rotation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawWindowEvent {
    pub time_nanos: u64,
    pub kind: WindowEventKind,
    pub metrics: DisplayMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerAction {
    Down,
    Move,
    Up,
    Cancel,
}

// Single pointer sample in raw pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPointer {
    pub id: PointerId,
    pub x: f32,
    pub y: f32,
}

impl RawPointer {
    pub fn new(id: PointerId, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }
}

/// Touch sample batch as delivered by one platform callback
///
/// `changed_id` names the pointer a DOWN or UP applies to; it is ignored for
/// MOVE and CANCEL. `pointers` lists every pointer currently on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPointerEvent {
    pub time_nanos: u64,
    pub action: PointerAction,
    pub changed_id: PointerId,
    pub pointers: Vec<RawPointer>,
    pub display: DisplayMetrics,
}

impl RawPointerEvent {
    pub fn pointer(&self, id: PointerId) -> Option<&RawPointer> {
        self.pointers.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    Gyroscope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorAccuracy {
    Unreliable,
    Low,
    Medium,
    High,
}

impl SensorAccuracy {
    /// Maps the platform's integer accuracy status; unknown codes are unreliable
    pub fn from_platform_code(code: i32) -> Self {
        match code {
            1 => SensorAccuracy::Low,
            2 => SensorAccuracy::Medium,
            3 => SensorAccuracy::High,
            _ => SensorAccuracy::Unreliable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSensorEvent {
    pub time_nanos: u64,
    pub sensor_type: SensorType,
    pub values: [f32; 3],
    pub accuracy: SensorAccuracy,
}

impl RawSensorEvent {
    pub fn gyroscope(time_nanos: u64, values: [f32; 3], accuracy: SensorAccuracy) -> Self {
        Self {
            time_nanos,
            sensor_type: SensorType::Gyroscope,
            values,
            accuracy,
        }
    }
}

// What a drop report accounts for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropKind {
    Sensor,
    PointerMove,
}

/// Batched drop report generated by the backpressure queue itself
#[derive(Debug, Clone, PartialEq)]
pub struct RawDropEvent {
    pub time_nanos: u64,
    pub kind: DropKind,
    pub dropped_count: u64,
}
