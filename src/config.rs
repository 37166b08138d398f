//! Externally supplied settings: where the tracking server lives and how hard to try.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{api::error::ConfigError, retry::{Backoff, RetryPolicy}};

/// Environment variable overriding [`Config::tracking_uri`].
pub const TRACKING_URI_ENV: &str = "MLFLOW_TRACKING_URI";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base address of the REST API, e.g. `http://127.0.0.1:5000/api`.
    pub tracking_uri: String,
    pub experiments_page_size: u32,
    pub runs_page_size: u32,
    /// Retries per page after the first attempt.
    pub max_retries: u32,
    /// The n-th retry waits `n * retry_backoff_ms`.
    pub retry_backoff_ms: u64,
    /// Experiments with exactly this name are hidden from the list.
    pub excluded_experiment: Option<String>,
    pub timeout_ms: u64,
    /// UTC offset chart and card labels are rendered in.
    pub label_offset_minutes: i32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tracking_uri: "http://127.0.0.1:5000/api".to_owned(),
            experiments_page_size: 100,
            runs_page_size: 50,
            max_retries: 3,
            retry_backoff_ms: 1000,
            excluded_experiment: Some("Weather_Evaluation".to_owned()),
            timeout_ms: 30_000,
            label_offset_minutes: 0,
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Applies `MLFLOW_TRACKING_URI` if it is set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(uri) = std::env::var(TRACKING_URI_ENV) {
            if !uri.trim().is_empty() {
                self.tracking_uri = uri;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracking_uri.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "tracking_uri",
                reason: "must not be empty".to_owned(),
            });
        }
        for &(field, size) in &[
            ("experiments_page_size", self.experiments_page_size),
            ("runs_page_size", self.runs_page_size),
        ] {
            if size == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".to_owned(),
                });
            }
        }
        if self.label_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::Invalid {
                field: "label_offset_minutes",
                reason: format!("{} is not a valid UTC offset", self.label_offset_minutes),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Backoff::Linear(Duration::from_millis(self.retry_backoff_ms)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::api::error::ConfigError;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = Config::from_json_str(r#"{"tracking_uri": "http://mlflow:5003/api", "runs_page_size": 10}"#).unwrap();
        assert_eq!(config.tracking_uri, "http://mlflow:5003/api");
        assert_eq!(config.runs_page_size, 10);
        assert_eq!(config.experiments_page_size, 100);
        assert_eq!(config.excluded_experiment.as_deref(), Some("Weather_Evaluation"));
    }

    #[test]
    fn null_disables_exclusion() {
        let config = Config::from_json_str(r#"{"excluded_experiment": null}"#).unwrap();
        assert_eq!(config.excluded_experiment, None);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        match Config::from_json_str(r#"{"experiments_page_size": 0}"#) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "experiments_page_size"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            Config::from_json_str(r#"{"page_size": 5}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn retry_policy_follows_config() {
        let config = Config { max_retries: 2, retry_backoff_ms: 250, ..Config::default() };
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries(), 2);
        assert_eq!(policy.delay(2), std::time::Duration::from_millis(500));
    }
}
