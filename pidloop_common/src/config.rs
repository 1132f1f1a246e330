//! Loop configuration files: TOML loading, validation and shared fields.
//!
//! Every pidloop binary reads one TOML file with a `[shared]` section plus
//! its own sections. Types that can check themselves implement [`Validate`];
//! [`ConfigLoader::load_validated`] parses and validates in one step, so an
//! invalid file never reaches a controller.
//!
//! ```rust,no_run
//! use pidloop_common::config::{ConfigError, ConfigLoader, SharedConfig, Validate};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct LoopFile {
//!     shared: SharedConfig,
//! }
//!
//! impl Validate for LoopFile {
//!     fn validate(&self) -> Result<(), ConfigError> {
//!         self.shared.validate()
//!     }
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let cfg = LoopFile::load_validated(Path::new("config/pidloop.toml"))?;
//!     println!("loop {}", cfg.shared.service_name);
//!     Ok(())
//! }
//! ```

use std::fmt::Display;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a configuration file was not accepted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("cannot read {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

impl ConfigError {
    /// Validation failure attributed to a named section.
    pub fn in_section(section: &str, reason: impl Display) -> Self {
        Self::ValidationError(format!("{section}: {reason}"))
    }
}

/// Log verbosity, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// `[shared]` section present in every pidloop file.
///
/// ```toml
/// [shared]
/// service_name = "oven-loop-01"
/// log_level = "debug"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Loop identifier used in logs.
    pub service_name: String,
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Validate for SharedConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::in_section("shared", "service_name cannot be empty"));
        }
        Ok(())
    }
}

/// Semantic checks run after parsing.
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// TOML loading for any deserializable configuration type.
pub trait ConfigLoader: Sized + DeserializeOwned {
    /// Read and parse `path`.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
            _ => ConfigError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse an in-memory TOML document.
    fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// [`load`](Self::load) followed by [`Validate::validate`].
    fn load_validated(path: &Path) -> Result<Self, ConfigError>
    where
        Self: Validate,
    {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// [`from_toml_str`](Self::from_toml_str) followed by [`Validate::validate`].
    fn parse_validated(content: &str) -> Result<Self, ConfigError>
    where
        Self: Validate,
    {
        let config = Self::from_toml_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> ConfigLoader for T {}
