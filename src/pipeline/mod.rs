//! Dispatch side of the pipeline
//!
//! 1. [`core`] - `InputCore`, the single owner of all normalization state
//! 2. [`sink`] - Output enum and the `FrameSink` consumer trait
//! 3. [`sync_pipeline`] - Runtime-free queue + core, drained by `pump`
//! 4. [`dispatch_worker`] - Typestate tokio worker draining the queue
//! 5. [`pipeline_handle`] - Spawn/shutdown API for the worker
//!
//! ```text
//! Waiting ──collect()──► Dispatching(EventBatch) ──dispatch()──► Waiting
//!    │
//!    └──finish()──► WorkerReport
//! ```

pub mod core;
pub mod dispatch_worker;
pub mod pipeline_handle;
pub mod sink;
pub mod sync_pipeline;

pub use self::core::{CoreSettings, CoreStats, InputCore};
pub use dispatch_worker::{WorkerReport, WorkerSettings};
pub use pipeline_handle::{PipelineHandle, PipelineSettings};
pub use sink::{FrameSink, NormalizedOutput};
pub use sync_pipeline::InputPipeline;
