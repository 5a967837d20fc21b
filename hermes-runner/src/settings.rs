//! Engine settings loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! bars_per_year = 94500
//! min_bars = 2
//! max_drop_fraction = 0.5
//! default_max_concurrency = 5
//! cache_ttl_secs = 86400
//! scan_timeout_secs = 120
//! data_dir = "data/minute"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use hermes_core::guard::GuardConfig;
use hermes_core::metrics::MINUTE_BARS_PER_YEAR;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or checking settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Annualization factor for Sharpe.
    pub bars_per_year: f64,
    /// Floor on surviving bars after the data guard.
    pub min_bars: usize,
    /// Fraction of dropped rows above which a run fails.
    pub max_drop_fraction: f64,
    pub default_max_concurrency: usize,
    pub cache_ttl_secs: u64,
    /// Stop dispatching new scan symbols after this long.
    pub scan_timeout_secs: Option<u64>,
    /// Directory of `<SYMBOL>.csv` files.
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bars_per_year: MINUTE_BARS_PER_YEAR,
            min_bars: 2,
            max_drop_fraction: 0.5,
            default_max_concurrency: 5,
            cache_ttl_secs: 86_400,
            scan_timeout_secs: None,
            data_dir: None,
        }
    }
}

impl EngineSettings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.bars_per_year.is_finite() && self.bars_per_year > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "bars_per_year must be positive, got {}",
                self.bars_per_year
            )));
        }
        if !(0.0..=1.0).contains(&self.max_drop_fraction) {
            return Err(ConfigError::Invalid(format!(
                "max_drop_fraction must be in [0, 1], got {}",
                self.max_drop_fraction
            )));
        }
        if self.min_bars < 2 {
            return Err(ConfigError::Invalid("min_bars must be at least 2".into()));
        }
        Ok(())
    }

    pub fn guard(&self) -> GuardConfig {
        GuardConfig {
            min_bars: self.min_bars,
            max_drop_fraction: self.max_drop_fraction,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_all_defaults() {
        let s = EngineSettings::from_toml_str("").unwrap();
        assert_eq!(s, EngineSettings::default());
        assert_eq!(s.bars_per_year, 94_500.0);
        assert_eq!(s.default_max_concurrency, 5);
        assert_eq!(s.cache_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let s = EngineSettings::from_toml_str(
            "bars_per_year = 252\nscan_timeout_secs = 30\ndata_dir = \"data\"\n",
        )
        .unwrap();
        assert_eq!(s.bars_per_year, 252.0);
        assert_eq!(s.scan_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(s.data_dir.as_deref(), Some(Path::new("data")));
        assert_eq!(s.min_bars, 2);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineSettings::from_toml_str("max_drop_fraction = 1.5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineSettings::from_toml_str("bars_per_year = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineSettings::load(Path::new("/nonexistent/hermes.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
