//! Configuration for imreview-core
//!
//! Tunables for the decision engine: commit retry budget, how the read path
//! reports forbidden manuscripts, and whether reads reconcile stored status.

use serde::{Deserialize, Serialize};

/// Engine-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Conditional-commit retry settings
    pub commit: CommitConfig,
    /// Access signalling settings
    pub access: AccessConfig,
    /// Read-path reconciliation settings
    pub reconcile: ReconcileConfig,
}

/// Derive-and-commit retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    /// Attempts before a concurrent modification is surfaced to the caller
    pub max_attempts: u32,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

/// Access signalling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Report forbidden reads as not-found so existence is not leaked.
    /// Mutation paths always report forbidden.
    pub conceal_forbidden_reads: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            conceal_forbidden_reads: true,
        }
    }
}

/// Read-path reconciliation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Recompute and correct stored status whenever a manuscript is fetched
    pub on_read: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { on_read: true }
    }
}

impl EngineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.commit.max_attempts == 0 {
            return Err(ConfigError::OutOfRange(
                "commit.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),
    /// Input could not be parsed or produced
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.commit.max_attempts, 5);
        assert!(config.access.conceal_forbidden_reads);
        assert!(config.reconcile.on_read);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [access]
            conceal_forbidden_reads = false
            "#,
        )
        .unwrap();
        assert!(!config.access.conceal_forbidden_reads);
        assert_eq!(config.commit.max_attempts, 5);
    }

    #[test]
    fn test_toml_serialization() {
        let mut config = EngineConfig::default();
        config.commit.max_attempts = 9;
        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = EngineConfig::from_json(r#"{"commit": {"max_attempts": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange(_)));
    }
}
