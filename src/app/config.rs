//! Configuration Management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::tap::RetryPolicy;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Event tap settings
    #[serde(default)]
    pub tap: TapConfig,
}

/// Event tap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Maximum tap creation attempts before giving up
    pub max_attempts: u32,
    /// Delay between attempts (ms)
    pub retry_delay_ms: u64,
}

impl Default for TapConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            retry_delay_ms: policy.delay.as_millis() as u64,
        }
    }
}

impl TapConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.tap.max_attempts == 0 {
            return Err(crate::Error::Config(
                "tap.max_attempts must be > 0".to_string(),
            ));
        }
        if self.tap.retry_delay_ms > 60_000 {
            return Err(crate::Error::Config(format!(
                "tap.retry_delay_ms must be <= 60000, got {}",
                self.tap.retry_delay_ms
            )));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".midclick").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tap.max_attempts, 300);
        assert_eq!(config.tap.retry_delay_ms, 1000);
    }

    #[test]
    fn test_default_retry_policy_roundtrip() {
        let config = Config::default();
        assert_eq!(config.tap.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[tap]"));
        assert!(toml.contains("max_attempts = 300"));
        assert!(toml.contains("retry_delay_ms = 1000"));
    }

    #[test]
    fn test_default_path() {
        let path = Config::default_path();
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let mut original = Config::default();
        original.tap.max_attempts = 10;
        original.tap.retry_delay_ms = 250;

        original.save(&config_path).expect("Failed to save config");
        assert!(config_path.exists());

        let loaded = Config::load(&config_path).expect("Failed to load config");
        assert_eq!(loaded.tap.max_attempts, 10);
        assert_eq!(loaded.tap.retry_delay_ms, 250);
    }

    #[test]
    fn test_config_save_creates_parent_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let nested_path = temp_dir.path().join("nested").join("config.toml");

        Config::default()
            .save(&nested_path)
            .expect("Failed to save config");
        assert!(nested_path.exists());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let nonexistent_path = PathBuf::from("/tmp/nonexistent_midclick_config.toml");
        assert!(Config::load(&nonexistent_path).is_err());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        // A config without a [tap] section gets the default retry budget.
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.tap.max_attempts, 300);
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_attempts() {
        let mut config = Config::default();
        config.tap.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_excessive_delay() {
        let mut config = Config::default();
        config.tap.retry_delay_ms = 120_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("bad_config.toml");
        std::fs::write(
            &config_path,
            "[tap]\nmax_attempts = 0\nretry_delay_ms = 1000\n",
        )
        .expect("Failed to write config");

        assert!(Config::load(&config_path).is_err());
    }

    #[test]
    fn test_invalid_toml_parsing() {
        let invalid_toml = "this is not valid toml {{{}}}";
        let result: Result<Config, _> = toml::from_str(invalid_toml);
        assert!(result.is_err());
    }
}
