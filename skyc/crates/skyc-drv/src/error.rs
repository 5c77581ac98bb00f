//! Driver error type.
//!
//! Wraps the terminal [`CompileError`] of a unit together with the failures
//! that only exist at the driver level: reading sources and configuration.

use std::path::{Path, PathBuf};

use skyc_util::CompileError;
use thiserror::Error;

/// Every way a driver operation can fail.
#[derive(Error, Debug)]
pub enum DriverError {
    /// A unit was rejected by the lexer or the parser.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A source or configuration file could not be read or written.
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Configuration text is not valid TOML for [`crate::Config`].
    #[error("invalid configuration{}: {message}", origin(.path))]
    Config {
        /// File the text came from, if any
        path: Option<PathBuf>,
        /// Parser or serializer message
        message: String,
    },

    /// The session holds no source units.
    #[error("no input files")]
    NoInputFiles,
}

fn origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in {}", path.display()),
        None => String::new(),
    }
}

impl DriverError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        DriverError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The compile error, when a unit was rejected.
    pub fn as_compile_error(&self) -> Option<&CompileError> {
        match self {
            DriverError::Compile(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias using DriverError.
pub type DriverResult<T> = std::result::Result<T, DriverError>;
