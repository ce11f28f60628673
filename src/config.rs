//! Core Configuration
//!
//! Tunables for synchronization, fee caching, preload refresh and device
//! interaction. Every field has a default, so a partial JSON document is
//! enough to override a single setting.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{HawalaError, HawalaResult};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub sync: SyncSettings,
    pub fees: FeeSettings,
    pub preload: PreloadSettings,
    pub device: DeviceSettings,
}

/// Operation history synchronization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Records requested per page
    pub page_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

/// Fee quote caching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSettings {
    pub max_age_secs: u64,
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self { max_age_secs: 60 }
    }
}

impl FeeSettings {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// Chain-wide preload data refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadSettings {
    pub max_age_secs: u64,
}

impl Default for PreloadSettings {
    fn default() -> Self {
        Self { max_age_secs: 60 * 60 }
    }
}

impl PreloadSettings {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// Hardware device interaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Ask the user to confirm addresses on screen by default
    pub require_address_confirmation: bool,
}

impl CoreConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> HawalaResult<Self> {
        let config: CoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> HawalaResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> HawalaResult<()> {
        if self.sync.page_size == 0 {
            return Err(HawalaError::config_error("sync.page_size must be positive"));
        }
        if self.fees.max_age_secs == 0 {
            return Err(HawalaError::config_error("fees.max_age_secs must be positive"));
        }
        if self.preload.max_age_secs == 0 {
            return Err(HawalaError::config_error("preload.max_age_secs must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.sync.page_size, 100);
        assert_eq!(config.fees.max_age(), Duration::from_secs(60));
        assert_eq!(config.preload.max_age(), Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config = CoreConfig::from_json(r#"{"sync": {"page_size": 25}}"#).unwrap();
        assert_eq!(config.sync.page_size, 25);
        assert_eq!(config.fees.max_age_secs, 60);
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let err = CoreConfig::from_json(r#"{"sync": {"page_size": 0}}"#).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigError);
    }
}
