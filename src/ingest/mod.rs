//! Raw event ingestion
//!
//! Everything on the producer side of the pipeline:
//!
//! 1. [`raw_event`] - Raw window, pointer, sensor and drop events
//! 2. [`backpressure`] - Bounded FIFO with drop/evict overflow policy
//! 3. [`ingest_handle`] - Non-blocking submission handle for platform callbacks
//!
//! ```text
//! Platform callbacks ──► IngestHandle ──► BackpressureQueue ──► consumer
//!   (any thread)          (non-blocking)    (critical never lost)
//! ```

pub mod backpressure;
pub mod ingest_handle;
pub mod raw_event;

pub use backpressure::{BackpressureQueue, PushOutcome, QueueSettings, QueueStats};
pub use ingest_handle::IngestHandle;
pub use raw_event::{
    DisplayMetrics, DropKind, PointerAction, PointerId, Priority, RawDropEvent, RawEvent,
    RawPointer, RawPointerEvent, RawSensorEvent, RawWindowEvent, Rotation, SensorAccuracy,
    SensorType, WindowEventKind,
};
