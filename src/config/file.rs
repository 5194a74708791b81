// src/config/file.rs
// File-based configuration from ~/.doggy-detective/config.toml

use crate::config::env::{ClientConfig, ConfidenceScale};
use crate::error::{DetectiveError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Top-level config structure
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub client: ClientSection,
}

/// `[client]` section. Every key is optional and overrides the built-in default.
#[derive(Debug, Deserialize, Default)]
pub struct ClientSection {
    pub base_url: Option<String>,
    pub classify_path: Option<String>,
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub max_upload_bytes: Option<u64>,
    pub confidence_scale: Option<ConfidenceScale>,
}

impl FileConfig {
    /// Read `explicit`, or the default location when none is given.
    ///
    /// An explicit file must exist and parse. A missing or broken default file
    /// yields an empty config.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);

        match Self::read(&path) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config from file");
                Ok(config)
            }
            Err(e) if explicit.is_some() => Err(e),
            Err(DetectiveError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Ok(Self::default())
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".doggy-detective")
            .join("config.toml")
    }

    /// Overlay the values present in the file onto `config`
    pub fn apply(&self, config: &mut ClientConfig) {
        let section = &self.client;
        if let Some(url) = &section.base_url {
            config.base_url = url.clone();
        }
        if let Some(path) = &section.classify_path {
            config.classify_path = path.clone();
        }
        if let Some(secs) = section.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = section.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = section.max_upload_bytes {
            config.max_upload_bytes = bytes;
        }
        if let Some(scale) = section.confidence_scale {
            config.confidence_scale = scale;
        }
    }
}
