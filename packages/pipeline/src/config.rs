use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| PipelineError::Config("DATABASE_URL not set".into()))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            database_url,
            max_connections,
        })
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

/// Where split output goes and which queues it is handed to.
#[derive(Debug, Clone, Default)]
pub struct SplitConfig {
    /// Output directory. `None` writes next to the source file.
    pub output_dir: Option<PathBuf>,
    /// Queue each output file is made pending in.
    pub output_queue: Option<String>,
    /// Queue the source file is moved to after a successful split.
    pub source_queue: Option<String>,
}

impl SplitConfig {
    pub fn from_env() -> Self {
        Self {
            output_dir: non_empty_var("SPLIT_OUTPUT_DIR").map(PathBuf::from),
            output_queue: non_empty_var("SPLIT_OUTPUT_QUEUE"),
            source_queue: non_empty_var("SPLIT_SOURCE_QUEUE"),
        }
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    pub fn with_output_queue(mut self, queue: impl Into<String>) -> Self {
        self.output_queue = Some(queue.into());
        self
    }

    pub fn with_source_queue(mut self, queue: impl Into<String>) -> Self {
        self.source_queue = Some(queue.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Action whose pending files this worker splits.
    pub split_action: String,
    pub split: SplitConfig,
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
    pub health_port: u16,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        let pipeline = PipelineConfig::from_env()?;

        let split_action = non_empty_var("SPLIT_ACTION")
            .ok_or_else(|| PipelineError::Config("SPLIT_ACTION not set".into()))?;

        let poll_interval_secs: u64 = std::env::var("WORKER_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let max_poll_interval_secs: u64 = std::env::var("WORKER_MAX_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let health_port: u16 = std::env::var("HEALTH_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);

        Ok(Self {
            database_url: pipeline.database_url,
            max_connections: pipeline.max_connections,
            split_action,
            split: SplitConfig::from_env(),
            poll_interval: Duration::from_secs(poll_interval_secs),
            max_poll_interval: Duration::from_secs(max_poll_interval_secs),
            health_port,
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            database_url: self.database_url.clone(),
            max_connections: self.max_connections,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
