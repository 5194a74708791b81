// src/config/mod.rs
// Client configuration: defaults, optional TOML file, environment overrides

pub mod env;
pub mod file;

pub use env::{ClientConfig, ConfidenceScale, ConfigValidation};
pub use file::FileConfig;
