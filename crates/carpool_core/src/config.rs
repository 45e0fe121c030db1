//! Storage configuration loaded from a JSON file.
//!
//! ```json
//! { "backend": "csv", "data_dir": "data", "log_level": "info" }
//! ```
//!
//! Relative paths are resolved against the directory of the config file.

use crate::logging::{default_log_level, normalize_level};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DATABASE_FILE: &str = "carpool.sqlite3";

/// Persistence backend selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Csv,
    Xml,
    Document,
    Sqlite,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::Document => "document",
            Self::Sqlite => "sqlite",
        }
    }

    /// True for backends stored as one file per collection under `data_dir`.
    pub fn is_file_based(self) -> bool {
        matches!(self, Self::Csv | Self::Xml)
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xml" => Ok(Self::Xml),
            "document" | "doc" => Ok(Self::Document),
            "sqlite" | "relational" => Ok(Self::Sqlite),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    UnknownBackend(String),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "malformed config `{}`: {source}", path.display())
            }
            Self::UnknownBackend(value) => write!(
                f,
                "unknown backend `{value}`; expected csv|xml|document|sqlite"
            ),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    backend: Option<BackendKind>,
    data_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
    log_level: Option<String>,
}

/// Resolved storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: BackendKind,
    /// Directory of the file backends.
    pub data_dir: PathBuf,
    /// SQLite file of the relational and document backends.
    pub database_path: PathBuf,
    pub log_level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::rooted_at(Path::new("."))
    }
}

impl StorageConfig {
    /// Defaults with every path under `base`.
    pub fn rooted_at(base: &Path) -> Self {
        let data_dir = base.join(DEFAULT_DATA_DIR);
        Self {
            backend: BackendKind::Sqlite,
            database_path: data_dir.join(DEFAULT_DATABASE_FILE),
            data_dir,
            log_level: default_log_level().to_string(),
        }
    }

    /// Reads and validates the JSON config at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json(&text, base).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parses `text`, resolving relative paths against `base`.
    pub fn from_json(text: &str, base: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        let defaults = Self::rooted_at(base);
        let data_dir = raw
            .data_dir
            .map(|dir| resolve(base, dir))
            .unwrap_or(defaults.data_dir);
        let database_path = raw
            .database_path
            .map(|file| resolve(base, file))
            .unwrap_or_else(|| data_dir.join(DEFAULT_DATABASE_FILE));

        let config = Self {
            backend: raw.backend.unwrap_or(defaults.backend),
            data_dir,
            database_path,
            log_level: raw.log_level.unwrap_or(defaults.log_level),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir cannot be empty".to_string()));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database_path cannot be empty".to_string(),
            ));
        }
        normalize_level(&self.log_level).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(())
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
