use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::pipeline::{PipelineError, TableFormat, DEFAULT_MAX_DRIVERS};

/// Tunables for a [`Pipeline`](crate::Pipeline).
///
/// Every field has a default, so a JSON config file only needs the fields it changes:
///
/// ```
/// use wtp_predictor::PipelineConfig;
///
/// let config = PipelineConfig::from_json_str(r#"{ "table": { "delimiter": ";", "decimal_separator": "," } }"#).unwrap();
/// assert_eq!(config.max_drivers, 7);
/// assert_eq!(config.table.delimiter, ';');
/// assert_eq!(config.table.target_column, "WTP");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of ranked drivers reported per assessment
    pub max_drivers: usize,
    /// Threads used for bulk evaluation; 0 lets the system decide
    pub workers: usize,
    /// Layout of bulk input tables
    pub table: TableFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_drivers: DEFAULT_MAX_DRIVERS,
            workers: 0, // Let the system decide
            table: TableFormat::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_drivers == 0 {
            return Err(PipelineError::ValidationError("max_drivers must be at least 1".into()));
        }
        self.table.validate()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, PipelineError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| PipelineError::ValidationError(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            PipelineError::ValidationError(format!("Failed to read config {:?}: {}", path, e))
        })?;
        Self::from_json_str(&raw)
    }
}
