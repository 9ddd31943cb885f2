//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line arguments
//! 2. Environment variables (clap reads these alongside the arguments)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error; defaults are used instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "songbook.toml";

/// Compiled defaults used when no other source provides a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub music_info_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: PathBuf::from("songbook.db"),
            music_info_timeout_secs: 10,
            request_timeout_secs: 10,
            log_level: "info".to_string(),
        }
    }
}

/// Configuration file contents
///
/// Every key is optional. Unknown keys are rejected so typos surface early.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub music_info_url: Option<String>,
    pub music_info_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the config file if it exists
    ///
    /// `None` means the file is absent, which callers treat as "use defaults".
    /// A file that exists but does not parse is an error.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub music_info_url: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    /// External song details endpoint; enrichment is skipped when `None`
    pub music_info_url: Option<String>,
    pub music_info_timeout: Duration,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge overrides, file values, and compiled defaults
    pub fn resolve(overrides: ConfigOverrides, file: TomlConfig) -> Result<Self> {
        let defaults = CompiledDefaults::default();

        let music_info_url = overrides
            .music_info_url
            .or(file.music_info_url)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        if let Some(url) = &music_info_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "music_info_url must be an http(s) URL, got {:?}",
                    url
                )));
            }
        }

        let music_info_timeout_secs = file
            .music_info_timeout_secs
            .unwrap_or(defaults.music_info_timeout_secs);
        let request_timeout_secs = file
            .request_timeout_secs
            .unwrap_or(defaults.request_timeout_secs);

        if music_info_timeout_secs == 0 || request_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be at least 1 second".to_string()));
        }

        Ok(Self {
            host: overrides.host.or(file.host).unwrap_or(defaults.host),
            port: overrides.port.or(file.port).unwrap_or(defaults.port),
            database_path: overrides
                .database_path
                .or(file.database_path)
                .unwrap_or(defaults.database_path),
            music_info_url,
            music_info_timeout: Duration::from_secs(music_info_timeout_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            log_level: overrides
                .log_level
                .or(file.logging.level)
                .unwrap_or(defaults.log_level),
        })
    }

    /// Socket address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
