//! Error types for the runtime surfaces around the normalization core
//!
//! The core itself never fails; these cover configuration and the async
//! dispatch worker.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The consumer dropped its receiver while frames were still being produced
    #[error("Output channel closed")]
    OutputClosed,

    /// Spawning requires a tokio runtime context
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// The dispatch task panicked or was aborted
    #[error("Dispatch worker failed: {0}")]
    WorkerJoin(String),

    #[error("Pipeline already shut down")]
    AlreadyShutDown,
}
