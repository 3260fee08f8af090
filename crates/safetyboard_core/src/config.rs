//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe the knobs a host passes to core: log level/dir, database
//!   location and the notification timeline policy.
//! - Validate them once, before anything is opened.
//!
//! # Invariants
//! - A loaded config always has a supported log level and non-zero day
//!   limits.

use crate::engine::deadline::NotificationPolicy;
use crate::logging::{default_log_level, normalize_level};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    UnsupportedLogLevel(String),
    ZeroDayLimit { field: &'static str },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "cannot read config file {}: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::UnsupportedLogLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::ZeroDayLimit { field } => write!(f, "`policy.{field}` must be at least 1"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::UnsupportedLogLevel(_) | Self::ZeroDayLimit { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    /// Absolute log directory; `None` leaves logging to the host.
    pub log_dir: Option<PathBuf>,
    /// Database file; `None` leaves the location to the host.
    pub db_path: Option<PathBuf>,
    pub policy: NotificationPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
            policy: NotificationPolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON config document. Missing keys take defaults.
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Normalizes the log level and checks the policy limits.
    pub fn validate(&mut self) -> ConfigResult<()> {
        let level = normalize_level(&self.log_level)
            .map_err(|_| ConfigError::UnsupportedLogLevel(self.log_level.trim().to_string()))?;
        self.log_level = level.to_string();

        if self.policy.severe_days_limit == 0 {
            return Err(ConfigError::ZeroDayLimit {
                field: "severe_days_limit",
            });
        }
        if self.policy.standard_days_limit == 0 {
            return Err(ConfigError::ZeroDayLimit {
                field: "standard_days_limit",
            });
        }
        Ok(())
    }
}
