//! DispatchConfig - concurrency budget and timeouts for one dispatcher

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DispatchError;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] DispatchError),
}

/// ```toml
/// concurrency = 4
/// task_timeout_ms = 30000
/// batch_timeout_ms = 120000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub concurrency: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_timeout_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_timeout_ms: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            task_timeout_ms: None,
            batch_timeout_ms: None,
        }
    }
}

impl DispatchConfig {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn task_timeout_duration(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }

    pub fn batch_timeout_duration(&self) -> Option<Duration> {
        self.batch_timeout_ms.map(Duration::from_millis)
    }

    /// Fail fast before any task is scheduled.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.concurrency == 0 {
            return Err(DispatchError::InvalidConcurrency(self.concurrency));
        }
        if self.task_timeout_ms == Some(0) {
            return Err(DispatchError::InvalidTimeout("task"));
        }
        if self.batch_timeout_ms == Some(0) {
            return Err(DispatchError::InvalidTimeout("batch"));
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading dispatch config");
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = DispatchConfig::default();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = DispatchConfig::with_concurrency(0).validate().unwrap_err();
        assert_eq!(err, DispatchError::InvalidConcurrency(0));
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let config = DispatchConfig {
            task_timeout_ms: Some(0),
            ..DispatchConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            DispatchError::InvalidTimeout("task")
        );
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config = DispatchConfig::from_toml_str("task_timeout_ms = 1500").unwrap();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(
            config.task_timeout_duration(),
            Some(Duration::from_millis(1500))
        );
        assert!(config.batch_timeout_duration().is_none());
    }

    #[test]
    fn invalid_toml_values_surface_as_errors() {
        assert!(matches!(
            DispatchConfig::from_toml_str("concurrency = 0"),
            Err(ConfigError::Invalid(DispatchError::InvalidConcurrency(0)))
        ));
        assert!(matches!(
            DispatchConfig::from_toml_str("concurrency = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "concurrency = 2\nbatch_timeout_ms = 500").unwrap();

        let config = DispatchConfig::load(file.path()).unwrap();
        assert_eq!(config, DispatchConfig::with_concurrency(2).batch_timeout(Duration::from_millis(500)));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = DispatchConfig::load(Path::new("/nonexistent/splitter.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/splitter.toml"));
    }
}
