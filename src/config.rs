//! Pipeline configuration
//!
//! Loaded from TOML. Every section and field is optional; missing values fall
//! back to the reference defaults (4096-entry queue, drop report every 100
//! drops, 60 Hz MOVE coalescing).
//!
//! ```toml
//! [queue]
//! capacity = 4096
//! drop_report_batch = 100
//!
//! [pointer]
//! move_rate_hz = 60
//!
//! [worker]
//! output_buffer = 1024
//! max_batch = 256
//! idle_flush_ms = 50
//! stats_interval_secs = 30
//!
//! [diagnostics]
//! warn_interval_ms = 1000
//!
//! [logging]
//! level = "info"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ingest::backpressure::QueueSettings;
use crate::normalize::pointer::PointerSettings;
use crate::pipeline::core::CoreSettings;
use crate::pipeline::dispatch_worker::WorkerSettings;
use crate::pipeline::pipeline_handle::PipelineSettings;

const CONFIG_DIR_NAME: &str = "inputframe";
const CONFIG_FILE_NAME: &str = "pipeline.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub queue: QueueConfig,
    pub pointer: PointerConfig,
    pub worker: WorkerConfig,
    pub diagnostics: DiagnosticsConfig,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
    pub drop_report_batch: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            drop_report_batch: 100,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PointerConfig {
    pub move_rate_hz: u32,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self { move_rate_hz: 60 }
    }
}

impl PointerConfig {
    pub fn move_interval_ns(&self) -> u64 {
        1_000_000_000 / u64::from(self.move_rate_hz.max(1))
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    pub output_buffer: usize,
    pub max_batch: usize,
    /// Flush a pending coalesced MOVE after this much input silence; off when unset
    pub idle_flush_ms: Option<u64>,
    pub stats_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            output_buffer: 1024,
            max_batch: 256,
            idle_flush_ms: None,
            stats_interval_secs: 30,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub warn_interval_ms: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            warn_interval_ms: 1000,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading pipeline config from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads the user config file if present, else the defaults
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                info!("Using pipeline config {}", path.display());
                Self::load(path)
            }
            _ => {
                info!("No pipeline config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.capacity == 0 {
            return Err(ConfigError::Invalid("queue.capacity must be at least 1".into()));
        }
        if self.queue.drop_report_batch == 0 {
            return Err(ConfigError::Invalid(
                "queue.drop_report_batch must be at least 1".into(),
            ));
        }
        if !(1..=1000).contains(&self.pointer.move_rate_hz) {
            return Err(ConfigError::Invalid(format!(
                "pointer.move_rate_hz must be within 1..=1000, got {}",
                self.pointer.move_rate_hz
            )));
        }
        if self.worker.output_buffer == 0 || self.worker.max_batch == 0 {
            return Err(ConfigError::Invalid(
                "worker.output_buffer and worker.max_batch must be at least 1".into(),
            ));
        }
        if self.worker.idle_flush_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "worker.idle_flush_ms must be positive when set".into(),
            ));
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            queue: QueueSettings {
                capacity: self.queue.capacity,
                drop_report_batch: self.queue.drop_report_batch,
            },
            core: CoreSettings {
                pointer: PointerSettings {
                    move_interval_ns: self.pointer.move_interval_ns(),
                },
                warn_interval: Duration::from_millis(self.diagnostics.warn_interval_ms),
            },
            worker: WorkerSettings {
                max_batch: self.worker.max_batch,
                idle_flush: self.worker.idle_flush_ms.map(Duration::from_millis),
                stats_interval_secs: self.worker.stats_interval_secs,
            },
        }
    }
}
