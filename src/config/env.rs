// src/config/env.rs
// Environment-based configuration and the explicitly constructed ClientConfig

use crate::config::file::FileConfig;
use crate::error::{DetectiveError, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Default classifier service address (local development server)
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Default classification route on the service
pub const DEFAULT_CLASSIFY_PATH: &str = "/api/classify";
/// Default upload timeout, measured from request start
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(75);
/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Largest image accepted for upload (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// How confidence values in a classifier response are interpreted.
///
/// Results are always exposed on the 0-100 percent scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceScale {
    /// Fraction scale if every value is in `[0, 1]` and they sum to at most 1,
    /// percent scale otherwise.
    #[default]
    Auto,
    /// Values are already percentages.
    Percent,
    /// Values are fractions in `[0, 1]` and get multiplied by 100.
    Fraction,
}

impl FromStr for ConfidenceScale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "percent" | "percentage" => Ok(Self::Percent),
            "fraction" | "unit" => Ok(Self::Fraction),
            other => Err(format!("unknown confidence scale '{}'", other)),
        }
    }
}

/// Configuration for one classifier client instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub classify_path: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_upload_bytes: u64,
    pub confidence_scale: ConfidenceScale,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            classify_path: DEFAULT_CLASSIFY_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            confidence_scale: ConfidenceScale::Auto,
        }
    }
}

/// Parse an override value. Trailing `# comments` and whitespace are dropped;
/// values that fail to parse are logged and ignored.
fn parse_override<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    let clean = raw.split('#').next().unwrap_or("").trim();
    if clean.is_empty() {
        return None;
    }
    match clean.parse::<T>() {
        Ok(parsed) => {
            debug!(key, value = clean, "Config override from environment");
            Some(parsed)
        }
        Err(_) => {
            warn!(key, value = %raw, "Config value failed to parse, keeping previous value");
            None
        }
    }
}

impl ClientConfig {
    /// Build the full configuration: defaults, then the TOML file, then environment.
    /// `.env` is not read here; the binary loads it before parsing arguments.
    ///
    /// An explicit `file` must exist and parse; the default file location is optional.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file_config = FileConfig::resolve(file)?;

        let mut config = Self::default();
        file_config.apply(&mut config);
        config.apply_overrides(|key| std::env::var(key).ok());

        let validation = config.validate();
        for warning in &validation.warnings {
            warn!(warning = %warning, "Configuration warning");
        }
        if !validation.is_valid() {
            return Err(DetectiveError::Config(validation.errors.join("; ")));
        }
        Ok(config)
    }

    /// Apply `DOGGY_*` overrides from any key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = parse_override::<String>("DOGGY_API_URL", lookup("DOGGY_API_URL")) {
            self.base_url = url;
        }
        if let Some(path) =
            parse_override::<String>("DOGGY_CLASSIFY_PATH", lookup("DOGGY_CLASSIFY_PATH"))
        {
            self.classify_path = path;
        }
        if let Some(secs) = parse_override::<u64>("DOGGY_TIMEOUT_SECS", lookup("DOGGY_TIMEOUT_SECS"))
        {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_override::<u64>(
            "DOGGY_CONNECT_TIMEOUT_SECS",
            lookup("DOGGY_CONNECT_TIMEOUT_SECS"),
        ) {
            self.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) =
            parse_override::<u64>("DOGGY_MAX_UPLOAD_BYTES", lookup("DOGGY_MAX_UPLOAD_BYTES"))
        {
            self.max_upload_bytes = bytes;
        }
        if let Some(scale) = parse_override::<ConfidenceScale>(
            "DOGGY_CONFIDENCE_SCALE",
            lookup("DOGGY_CONFIDENCE_SCALE"),
        ) {
            self.confidence_scale = scale;
        }
    }

    /// Full URL of the classification endpoint
    pub fn classify_url(&self) -> String {
        join_url(&self.base_url, &self.classify_path)
    }

    /// URL of the service status route
    pub fn health_url(&self) -> String {
        join_url(&self.base_url, "/")
    }

    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::new();

        if self.base_url.trim().is_empty() {
            validation.add_error("base URL is empty");
        } else if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            validation.add_error(format!(
                "base URL '{}' must start with http:// or https://",
                self.base_url
            ));
        }
        if self.timeout.is_zero() {
            validation.add_error("timeout must be greater than zero");
        }
        if self.max_upload_bytes == 0 {
            validation.add_error("max upload size must be greater than zero");
        }
        if self.connect_timeout > self.timeout {
            validation.add_warning(format!(
                "connect timeout ({:?}) exceeds request timeout ({:?})",
                self.connect_timeout, self.timeout
            ));
        }

        validation
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Configuration validation result
#[derive(Debug, Default)]
pub struct ConfigValidation {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Format as a human-readable report
    pub fn report(&self) -> String {
        if self.errors.is_empty() && self.warnings.is_empty() {
            return "config: ok".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("config error: {}", e))
            .chain(self.warnings.iter().map(|w| format!("config warning: {}", w)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
