//! Viewer configuration.
//!
//! Read from TOML (`--config` or `<config dir>/runscope/config.toml`). Every
//! section and field is optional; a missing file means all defaults. A few
//! settings can be overridden from the environment afterwards.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::format::{MetricFormatter, DEFAULT_CURRENCY};
use crate::normalize::TradeReasonPolicy;

pub const ENV_BASE_URL: &str = "RUNSCOPE_BASE_URL";
pub const ENV_LOG: &str = "RUNSCOPE_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiSource {
    #[default]
    Http,
    Demo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub source: ApiSource,
    /// Seed for the demo source.
    pub demo_seed: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 10,
            source: ApiSource::Http,
            demo_seed: 42,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub currency_symbol: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: DEFAULT_CURRENCY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Drop trades without a reason instead of labelling them "Trade".
    pub require_trade_reason: bool,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            require_trade_reason: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file; the terminal belongs to the UI.
    pub file: Option<PathBuf>,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub api: ApiConfig,
    pub display: DisplayConfig,
    pub markers: MarkerConfig,
    pub logging: LoggingConfig,
}

impl ViewerConfig {
    /// `<config dir>/runscope/config.toml`, when the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("runscope").join("config.toml"))
    }

    /// Parse `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `RUNSCOPE_BASE_URL` and `RUNSCOPE_LOG`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(env_opt(ENV_BASE_URL), env_opt(ENV_LOG));
    }

    fn apply_overrides(&mut self, base_url: Option<String>, filter: Option<String>) {
        if let Some(url) = base_url {
            self.api.base_url = url;
        }
        if let Some(filter) = filter {
            self.logging.filter = filter;
        }
    }

    pub fn trade_reason_policy(&self) -> TradeReasonPolicy {
        if self.markers.require_trade_reason {
            TradeReasonPolicy::RequireReason
        } else {
            TradeReasonPolicy::FallbackLabel
        }
    }

    pub fn formatter(&self) -> MetricFormatter {
        MetricFormatter::new(self.display.currency_symbol.clone())
    }

    /// Log file path: configured, else `<data dir>/runscope/runscope.log`,
    /// else `runscope.log` in the working directory.
    pub fn log_file(&self) -> PathBuf {
        self.logging.file.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("runscope").join("runscope.log"))
                .unwrap_or_else(|| PathBuf::from("runscope.log"))
        })
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ViewerConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, ViewerConfig::default());
        assert_eq!(cfg.trade_reason_policy(), TradeReasonPolicy::RequireReason);
        assert_eq!(cfg.display.currency_symbol, "₹");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[api]
source = "demo"
timeout_secs = 3

[display]
currency_symbol = "$"

[markers]
require_trade_reason = false
"#
        )
        .unwrap();

        let cfg = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(cfg.api.source, ApiSource::Demo);
        assert_eq!(cfg.api.timeout(), Duration::from_secs(3));
        assert_eq!(cfg.api.base_url, ApiConfig::default().base_url);
        assert_eq!(cfg.trade_reason_policy(), TradeReasonPolicy::FallbackLabel);
        assert_eq!(cfg.logging.filter, "info");
        assert_eq!(
            cfg.formatter().format(
                Some(&crate::domain::MetricValue::Number(5.0)),
                "final_portfolio_value"
            ),
            "$5.00"
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\nbase_url = 1").unwrap();
        assert!(matches!(
            ViewerConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = ViewerConfig::default();
        cfg.apply_overrides(Some("http://backend:8000".into()), None);
        assert_eq!(cfg.api.base_url, "http://backend:8000");
        assert_eq!(cfg.logging.filter, "info");

        cfg.apply_overrides(None, Some("runscope_core=debug".into()));
        assert_eq!(cfg.logging.filter, "runscope_core=debug");
    }
}
