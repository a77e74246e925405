//! Runtime settings: entry points, persisted-state key, timing of soft
//! failures. Loadable from a YAML file; every field has a default.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{RuntimeError, RuntimeResult};

/// Wait for a background provider before giving up on it (ms).
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 5000;

/// How long a status message stays visible (ms).
pub const DEFAULT_STATUS_TIMEOUT_MS: u64 = 2200;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Document loaded when the location names none, relative to the location.
    pub start_document: String,
    /// Page that bootstraps the runtime; history entries point back at it.
    pub entry_page: String,
    /// Query parameter carrying the document path in reload-safe URLs.
    pub file_param: String,
    /// Preference key holding the theme (`light` / `dark`).
    pub theme_storage_key: String,
    pub provider_timeout_ms: u64,
    pub status_timeout_ms: u64,
    /// Extension of documents the runtime renders itself, without the dot.
    pub ztmf_extension: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            start_document: "./index.ztmf".to_string(),
            entry_page: "index.html".to_string(),
            file_param: "file".to_string(),
            theme_storage_key: "lumo-theme".to_string(),
            provider_timeout_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
            status_timeout_ms: DEFAULT_STATUS_TIMEOUT_MS,
            ztmf_extension: lumo_ztmf::ZTMF_EXTENSION.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml_str(yaml: &str) -> RuntimeResult<Self> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> RuntimeResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RuntimeError::Config(format!("read {}: {}", path.display(), e)))?;
        let config: RuntimeConfig = serde_yaml::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> RuntimeResult<()> {
        if self.file_param.trim().is_empty() {
            return Err(RuntimeError::Config("file_param must not be empty".to_string()));
        }
        if self.ztmf_extension.trim().is_empty() || self.ztmf_extension.starts_with('.') {
            return Err(RuntimeError::Config(
                "ztmf_extension must be a bare extension like 'ztmf'".to_string(),
            ));
        }
        if self.provider_timeout_ms == 0 {
            return Err(RuntimeError::Config(
                "provider_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RuntimeConfig::from_yaml_str("start_document: ./home.ztmf\nprovider_timeout_ms: 250\n")
            .unwrap();
        assert_eq!(config.start_document, "./home.ztmf");
        assert_eq!(config.provider_timeout(), Duration::from_millis(250));
        assert_eq!(config.file_param, "file");
        assert_eq!(config.theme_storage_key, "lumo-theme");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(RuntimeConfig::from_yaml_str("file_param: ''").is_err());
        assert!(RuntimeConfig::from_yaml_str("ztmf_extension: .ztmf").is_err());
        assert!(RuntimeConfig::from_yaml_str("provider_timeout_ms: 0").is_err());
        assert!(RuntimeConfig::from_yaml_str("status_timeout_ms: [1]").is_err());
    }
}
