//! Event normalization
//!
//! Turns raw pointer and gyroscope samples into canonical frames:
//!
//! 1. [`rotation`] - Display metrics and the rotation into one fixed basis
//! 2. [`pointer`] - Per-id pointer state machine with MOVE coalescing
//! 3. [`gyro`] - Fixed axis remap of gyroscope samples
//! 4. [`diagnostics`] - Anomaly counters with throttled warnings
//! 5. [`frames`] - Immutable output frames
//!
//! None of these types synchronize internally; they are owned by a single
//! `InputCore` which sits behind the pipeline's exclusive-access boundary.

pub mod diagnostics;
pub mod frames;
pub mod gyro;
pub mod pointer;
pub mod rotation;

pub use diagnostics::{Anomaly, AnomalyCounts, Diagnostics, RateLimiter};
pub use frames::{
    Basis, CoordinateSpace, DropEvent, GyroFrame, PointerFrame, PointerPhase, PointerState,
};
pub use gyro::GyroNormalizer;
pub use pointer::{PointerNormalizer, PointerSettings, PointerStats, DEFAULT_MOVE_INTERVAL_NS};
pub use rotation::{CanonicalTransform, MetricsState};
