//! Gyroscope axis remapping
//!
//! The raw vector `[a, b, c]` maps to `pitch = a`, `roll = b`, `yaw = c` with
//! signs untouched. The assignment is fixed. Accuracy is informational only and
//! never suppresses a frame; timestamps are forwarded verbatim.

use crate::ingest::raw_event::{RawSensorEvent, SensorType};

use super::frames::GyroFrame;

#[derive(Debug, Default)]
pub struct GyroNormalizer {
    frames_emitted: u64,
}

impl GyroNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: &RawSensorEvent) -> GyroFrame {
        match event.sensor_type {
            SensorType::Gyroscope => {
                let [pitch_rate, roll_rate, yaw_rate] = event.values;
                self.frames_emitted += 1;
                GyroFrame {
                    time_nanos: event.time_nanos,
                    yaw_rate,
                    pitch_rate,
                    roll_rate,
                    accuracy: event.accuracy,
                }
            }
        }
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }
}
