//! Configuration
//!
//! Loaded from an optional TOML file. Every field has a default, so a
//! missing file or a partial file is fine:
//!
//! ```toml
//! log_filter = "labflow_engine=debug,info"
//!
//! [cache]
//! max_entries = 500
//! max_age_secs = 60
//!
//! [export]
//! include_header = false
//! ```

use crate::error::CoreError;
use labflow_store::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabflowConfig {
    /// Document cache eviction policy
    pub cache: CacheConfig,
    /// CSV export settings
    pub export: ExportConfig,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl LabflowConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With cache policy
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// With export settings
    #[inline]
    #[must_use]
    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }

    /// With log filter directive
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Load from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| CoreError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

impl Default for LabflowConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            export: ExportConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

/// CSV export settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Emit the header line before the rows
    pub include_header: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_header: true,
        }
    }
}
