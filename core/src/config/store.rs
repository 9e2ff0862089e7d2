//! Configuration Store
//!
//! Loading/saving of the TOML retrieval configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot write config file {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Parameters of a kernel retrieval
///
/// Read-only for the duration of a session. Every field has a default so a
/// partial TOML file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Horizons telnet host
    #[serde(default = "default_host")]
    pub host: String,

    /// Horizons telnet port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Email address required by Horizons SPK generation
    #[serde(default = "default_email")]
    pub email: String,

    /// Ephemeris start date for an SPK file
    #[serde(default = "default_start_date")]
    pub start_date: String,

    /// Ephemeris stop date for an SPK file
    #[serde(default = "default_stop_date")]
    pub stop_date: String,

    /// Max time to wait for each expected Horizons prompt
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Kernel file name format, `<OBJID>` and `<TARGET>` are substituted.
    /// Existing files are overwritten without warning.
    #[serde(default = "default_file_format")]
    pub file_format: String,

    /// Report download progress
    #[serde(default)]
    pub print_progress: bool,
}

fn default_host() -> String {
    "horizons.jpl.nasa.gov".to_string()
}

fn default_port() -> u16 {
    6775
}

fn default_email() -> String {
    "sorry@noemail.org".to_string()
}

fn default_start_date() -> String {
    "2010-01-01".to_string()
}

fn default_stop_date() -> String {
    "2040-01-01".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_file_format() -> String {
    "<OBJID>_<TARGET>.bsp".to_string()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            email: default_email(),
            start_date: default_start_date(),
            stop_date: default_stop_date(),
            timeout_secs: default_timeout_secs(),
            file_format: default_file_format(),
            print_progress: false,
        }
    }
}

impl RetrievalConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |reason: String| ConfigError::Write {
            path: path.to_path_buf(),
            reason,
        };

        let content = toml::to_string_pretty(self).map_err(|e| write_err(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| write_err(e.to_string()))
    }

    /// Load from the first config file found in the standard locations, or defaults
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match super::find_config_file() {
            Some(path) => {
                log::debug!("loading configuration from {}", path.display());
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Per-step timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = RetrievalConfig::default();
        assert_eq!(config.host, "horizons.jpl.nasa.gov");
        assert_eq!(config.port, 6775);
        assert_eq!(config.email, "sorry@noemail.org");
        assert_eq!(config.start_date, "2010-01-01");
        assert_eq!(config.stop_date, "2040-01-01");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.file_format, "<OBJID>_<TARGET>.bsp");
        assert!(!config.print_progress);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RetrievalConfig = toml::from_str(
            r#"
            email = "me@example.org"
            timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.email, "me@example.org");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.port, 6775);
        assert_eq!(config.file_format, "<OBJID>_<TARGET>.bsp");
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("sbspk.toml");

        let config = RetrievalConfig {
            start_date: "2016-01-01".to_string(),
            stop_date: "2018-06-01".to_string(),
            print_progress: true,
            ..Default::default()
        };
        config.save(&config_path).unwrap();

        let loaded = RetrievalConfig::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        std::fs::write(&config_path, "port = \"not a number\"").unwrap();

        let err = RetrievalConfig::load(&config_path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }
}
