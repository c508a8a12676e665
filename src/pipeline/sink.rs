use serde::Serialize;

use crate::normalize::frames::{DropEvent, GyroFrame, PointerFrame};

/// Output of the normalization core, in emission order
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum NormalizedOutput {
    Pointer(PointerFrame),
    Gyro(GyroFrame),
    Drop(DropEvent),
}

impl NormalizedOutput {
    pub fn time_nanos(&self) -> u64 {
        match self {
            NormalizedOutput::Pointer(frame) => frame.time_nanos,
            NormalizedOutput::Gyro(frame) => frame.time_nanos,
            NormalizedOutput::Drop(event) => event.time_nanos,
        }
    }

    pub fn as_pointer(&self) -> Option<&PointerFrame> {
        match self {
            NormalizedOutput::Pointer(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn as_gyro(&self) -> Option<&GyroFrame> {
        match self {
            NormalizedOutput::Gyro(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn as_drop(&self) -> Option<&DropEvent> {
        match self {
            NormalizedOutput::Drop(event) => Some(event),
            _ => None,
        }
    }
}

/// Consumer of emitted frames (the mapping/scripting stage)
///
/// Called synchronously from inside the core's exclusive section, in the
/// order the triggering raw events were accepted.
pub trait FrameSink {
    fn on_pointer_frame(&mut self, frame: PointerFrame);

    fn on_gyro_frame(&mut self, frame: GyroFrame);

    /// Overflow reports are informational; the default ignores them
    fn on_drop_event(&mut self, _event: DropEvent) {}
}

impl FrameSink for Vec<NormalizedOutput> {
    fn on_pointer_frame(&mut self, frame: PointerFrame) {
        self.push(NormalizedOutput::Pointer(frame));
    }

    fn on_gyro_frame(&mut self, frame: GyroFrame) {
        self.push(NormalizedOutput::Gyro(frame));
    }

    fn on_drop_event(&mut self, event: DropEvent) {
        self.push(NormalizedOutput::Drop(event));
    }
}
