//! Driver configuration.
//!
//! Loaded from a TOML file such as:
//!
//! ```toml
//! interner = "shared"
//! emit = "tokens"
//!
//! [limits]
//! max_locals = 100
//!
//! [log]
//! filter = "skyc_par=trace"
//! ```
//!
//! Every field is optional and falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use skyc_util::Limits;

use crate::error::{DriverError, DriverResult};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "skyc.toml";

/// Session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which string table the units intern into.
    pub interner: InternerMode,

    /// What a compiled unit produces.
    pub emit: EmitType,

    /// Per-function limits enforced by the parser.
    pub limits: Limits,

    /// Logging setup used by [`crate::init_logging`].
    pub log: LogConfig,
}

/// Ownership of the string table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InternerMode {
    /// One table owned by the session, units compiled one at a time.
    #[default]
    Local,
    /// A lock-protected table shared by units compiled in parallel.
    Shared,
}

/// Output of a compiled unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitType {
    /// Stop after lexing.
    Tokens,
    /// Parse and record every code-generation request.
    #[default]
    Requests,
}

/// Logging options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Parse configuration text.
    pub fn from_toml_str(text: &str) -> DriverResult<Self> {
        toml::from_str(text).map_err(|e| DriverError::Config {
            path: None,
            message: e.message().to_string(),
        })
    }

    /// Load configuration from a specific path.
    pub fn load(path: impl AsRef<Path>) -> DriverResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DriverError::io(path, e))?;
        toml::from_str(&content).map_err(|e| DriverError::Config {
            path: Some(path.to_path_buf()),
            message: e.message().to_string(),
        })
    }

    /// Save configuration to a specific path.
    pub fn save(&self, path: impl AsRef<Path>) -> DriverResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| DriverError::Config {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| DriverError::io(path, e))
    }
}
