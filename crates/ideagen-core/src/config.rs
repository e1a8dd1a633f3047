//! Configuration
//!
//! `~/.ideagen/config.toml`, then `IDEAGEN_*` environment variables. Every
//! field has a default so a missing file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api";
const DEFAULT_CHUNK_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Idea stream endpoint
    pub endpoint: String,
    /// Session file written by the sign-in flow
    pub session_file: Option<PathBuf>,
    /// Fail the stream if no data arrives for this long
    pub chunk_timeout_secs: u64,
    /// tracing filter directive, e.g. `info` or `ideagen_core=debug`
    pub log_filter: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            session_file: None,
            chunk_timeout_secs: DEFAULT_CHUNK_TIMEOUT_SECS,
            log_filter: "info".to_string(),
            log_file: None,
        }
    }
}

/// Base directory for ideagen's files
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ideagen")
}

impl Config {
    /// Load from `path`, or from the default location if `None`
    ///
    /// An explicit path must exist; the default one may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (data_dir().join("config.toml"), false),
        };

        let mut config = if !required && !path.exists() {
            Self::default()
        } else {
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            Self::from_toml_str(&content, &path)?
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `IDEAGEN_*` overrides using the given lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("IDEAGEN_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(path) = lookup("IDEAGEN_SESSION_FILE") {
            self.session_file = Some(PathBuf::from(path));
        }
        if let Some(filter) = lookup("IDEAGEN_LOG") {
            self.log_filter = filter;
        }
        if let Some(secs) = lookup("IDEAGEN_CHUNK_TIMEOUT").and_then(|s| s.parse().ok()) {
            self.chunk_timeout_secs = secs;
        }
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|_| ConfigError::InvalidEndpoint(self.endpoint.clone()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(ConfigError::InvalidEndpoint(self.endpoint.clone())),
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| data_dir().join("session.json"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| data_dir().join("ideagen.log"))
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs.max(1))
    }
}
