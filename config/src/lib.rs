//! Configuration for the strand binary.
//!
//! Read from `$STRAND_CONFIG` or `~/.strand/config.toml`. A missing file is
//! not an error; every field has a default.

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "STRAND_CONFIG";

pub const DEFAULT_CHUNK_FUNCTION: &str = "__strand_push";
pub const DEFAULT_LOG_FILTER: &str = "info";

const fn default_true() -> bool {
    true
}

fn default_chunk_function() -> String {
    DEFAULT_CHUNK_FUNCTION.to_owned()
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config at {}: {field} {reason}", path.display())]
    Invalid {
        path: PathBuf,
        field: &'static str,
        reason: &'static str,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StrandConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenderConfig {
    /// Route boundary failures to error boundaries in `html` renders.
    /// Streaming and data renders always catch.
    #[serde(default = "default_true")]
    pub catch_errors: bool,
    /// Client function each chunk script calls.
    #[serde(default = "default_chunk_function")]
    pub chunk_function: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            catch_errors: true,
            chunk_function: default_chunk_function(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives. `RUST_LOG` wins if set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// Replace every `${VAR}` with the variable's value (empty when unset).
/// An unclosed `${` is kept verbatim.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

impl StrandConfig {
    /// Load from the default location. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file; using defaults");
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {:?}: {}", path, source);
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::parse(&content, path)
    }

    /// Parse `content`; `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content).map_err(|source| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, source);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;

        config.render.chunk_function = expand_env_vars(&config.render.chunk_function);
        config.log.filter = expand_env_vars(&config.log.filter);

        let invalid = |field, reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            field,
            reason,
        };
        if config.render.chunk_function.trim().is_empty() {
            return Err(invalid("render.chunk_function", "must not be empty"));
        }
        if config.log.filter.trim().is_empty() {
            return Err(invalid("log.filter", "must not be empty"));
        }
        Ok(config)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

/// `$STRAND_CONFIG` if set and non-empty, else `~/.strand/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    match env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => dirs::home_dir().map(|home| home.join(".strand").join("config.toml")),
    }
}
