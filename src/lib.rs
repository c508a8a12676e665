//! Input event normalization for touch and gyroscope input
//!
//! Raw platform events enter through a non-blocking [`IngestHandle`], pass a
//! priority-aware [`BackpressureQueue`], and are turned into canonical
//! [`PointerFrame`]s and [`GyroFrame`]s by a single [`InputCore`]. The core can
//! be driven synchronously ([`InputPipeline`]) or by a tokio worker
//! ([`PipelineHandle`]).

pub mod config;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod pipeline;

pub use config::{ConfigError, PipelineConfig};
pub use error::PipelineError;
pub use ingest::{BackpressureQueue, IngestHandle, PushOutcome, QueueSettings, RawEvent};
pub use normalize::{DropEvent, GyroFrame, PointerFrame, PointerPhase};
pub use pipeline::{
    CoreSettings, FrameSink, InputCore, InputPipeline, NormalizedOutput, PipelineHandle,
    PipelineSettings, WorkerReport,
};
