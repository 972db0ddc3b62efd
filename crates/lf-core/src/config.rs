//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON. Every section
//! defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Argument(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None`, the file does not exist, or it fails to parse.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.pipeline.progress_interval_ms == 0 {
            warnings.push(
                "pipeline.progress_interval_ms is 0; every progress update will be delivered"
                    .into(),
            );
        }
        if self.pipeline.init_pause_ms > 10_000 {
            warnings.push(format!(
                "pipeline.init_pause_ms is {}; runs will wait over 10s before starting",
                self.pipeline.init_pause_ms
            ));
        }
        if self.pipeline.commit_pause_ms > 10_000 {
            warnings.push(format!(
                "pipeline.commit_pause_ms is {}; commits will wait over 10s",
                self.pipeline.commit_pause_ms
            ));
        }
        if let Some(ref filter) = self.logging.filter {
            if filter.trim().is_empty() {
                warnings.push("logging.filter is set but empty".into());
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Timing of the action pipeline's progress and cancellation stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum interval between delivered progress updates.
    pub progress_interval_ms: u64,
    /// Pause after the initialization message, giving a cancel request time
    /// to land before any action is initialized.
    pub init_pause_ms: u64,
    /// Pause after the committing message, before the store is replaced.
    pub commit_pause_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 100,
            init_pause_ms: 500,
            commit_pause_ms: 1500,
        }
    }
}

impl PipelineConfig {
    /// No pauses and no throttling. Used by tests and batch tooling.
    pub fn immediate() -> Self {
        Self {
            progress_interval_ms: 0,
            init_pause_ms: 0,
            commit_pause_ms: 0,
        }
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn init_pause(&self) -> Duration {
        Duration::from_millis(self.init_pause_ms)
    }

    pub fn commit_pause(&self) -> Duration {
        Duration::from_millis(self.commit_pause_ms)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is
    /// unset.
    pub filter: Option<String>,
}
