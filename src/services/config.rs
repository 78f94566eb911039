//! Configuration for the credential supervisor and script checks.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::check::ServiceCheck;
use crate::services::backoff::BackoffPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed for {field}: {reason}")]
    ValidationError { field: String, reason: String },
}

/// Top-level supervisor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub credentials: CredentialSettings,
    pub checks: CheckSettings,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.renewal_increment_secs == 0 {
            return Err(ConfigError::ValidationError {
                field: "credentials.renewal_increment_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.credentials.backoff_baseline_ms == 0 {
            return Err(ConfigError::ValidationError {
                field: "credentials.backoff_baseline_ms".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.credentials.backoff_limit_ms < self.credentials.backoff_baseline_ms {
            return Err(ConfigError::ValidationError {
                field: "credentials.backoff_limit_ms".to_string(),
                reason: "must be >= credentials.backoff_baseline_ms".to_string(),
            });
        }
        Ok(())
    }
}

/// Tunables for token derivation and renewal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Seconds requested from the issuer when extending a token's lifetime.
    pub renewal_increment_secs: u64,
    /// Baseline delay for derivation retries, in milliseconds.
    pub backoff_baseline_ms: u64,
    /// Upper bound on a single derivation retry delay, in milliseconds.
    pub backoff_limit_ms: u64,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            renewal_increment_secs: 30,
            backoff_baseline_ms: 5_000,
            backoff_limit_ms: 180_000,
        }
    }
}

impl CredentialSettings {
    /// Backoff policy derived from the configured schedule.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.backoff_baseline_ms),
            Duration::from_millis(self.backoff_limit_ms),
        )
    }
}

/// Tunables for script health checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckSettings {
    /// Smallest accepted interval between executions, in seconds.
    pub min_interval_secs: u64,
    /// Smallest accepted script timeout, in seconds.
    pub min_timeout_secs: u64,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            min_interval_secs: 1,
            min_timeout_secs: 1,
        }
    }
}

impl CheckSettings {
    /// Raise a check's interval and timeout to the configured minimums.
    pub fn sanitize(&self, check: &mut ServiceCheck) {
        check.interval = check.interval.max(Duration::from_secs(self.min_interval_secs));
        check.timeout = check.timeout.max(Duration::from_secs(self.min_timeout_secs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.credentials.renewal_increment_secs, 30);
        assert_eq!(config.credentials.backoff_baseline_ms, 5_000);
        assert_eq!(config.credentials.backoff_limit_ms, 180_000);
    }

    #[test]
    fn test_parse_overrides() {
        let raw = r#"
            [credentials]
            renewal_increment_secs = 60
            backoff_baseline_ms = 1000

            [checks]
            min_interval_secs = 10
        "#;

        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.credentials.renewal_increment_secs, 60);
        assert_eq!(config.credentials.backoff_baseline_ms, 1_000);
        // Untouched fields keep their defaults.
        assert_eq!(config.credentials.backoff_limit_ms, 180_000);
        assert_eq!(config.checks.min_interval_secs, 10);
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let mut config = Config::default();
        config.credentials.backoff_limit_ms = 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_backoff_policy_from_settings() {
        let settings = CredentialSettings::default();
        let policy = settings.backoff();
        assert_eq!(policy.delay(0), Duration::from_secs(5));
        assert_eq!(policy.delay(10), Duration::from_secs(180));
    }

    #[test]
    fn test_sanitize_raises_to_minimums() {
        let settings = CheckSettings {
            min_interval_secs: 10,
            min_timeout_secs: 2,
        };
        let mut check = ServiceCheck {
            name: "probe".to_string(),
            command: "/bin/true".to_string(),
            args: Vec::new(),
            interval: Duration::from_secs(1),
            timeout: Duration::from_millis(100),
        };

        settings.sanitize(&mut check);
        assert_eq!(check.interval, Duration::from_secs(10));
        assert_eq!(check.timeout, Duration::from_secs(2));
    }
}
