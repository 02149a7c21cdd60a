//! Error types for the magicfile-core library.
//!
//! Every detection either yields a classification string or one of these
//! errors. Nothing is signalled through the string channel.

use crate::check::Check;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for magicfile operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all magicfile operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The input was rejected before libmagic was called
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Why the input was rejected
        reason: String,
    },

    /// The file does not exist or cannot be read
    #[error("file cannot be read: '{path}'")]
    FileNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// `magic_open` did not return a handle
    #[error("failed to open libmagic for {check} check: {message}")]
    Open {
        /// Check the handle was requested for
        check: Check,
        /// Description of the failure
        message: String,
    },

    /// The signature database could not be loaded
    #[error("failed to load signature database {}: {message}", display_database(.database))]
    DatabaseLoad {
        /// Database that was requested, `None` for the default
        database: Option<PathBuf>,
        /// Message reported by libmagic
        message: String,
    },

    /// libmagic produced no usable classification
    #[error("{check} classification failed: {message}")]
    Classification {
        /// Check that was running
        check: Check,
        /// Message reported by libmagic
        message: String,
    },

    /// Reading the input stream failed
    #[error("failed to read input stream: {source}")]
    StreamRead {
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

fn display_database(database: &Option<PathBuf>) -> String {
    match database {
        Some(path) => format!("'{}'", path.display()),
        None => "(default)".to_string(),
    }
}

impl Error {
    /// Creates a new invalid input error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates a new file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates a new handle open error
    pub fn open(check: Check, message: impl Into<String>) -> Self {
        Self::Open {
            check,
            message: message.into(),
        }
    }

    /// Creates a new database load error
    pub fn database_load(database: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::DatabaseLoad {
            database,
            message: message.into(),
        }
    }

    /// Creates a new classification error
    pub fn classification(check: Check, message: impl Into<String>) -> Self {
        Self::Classification {
            check,
            message: message.into(),
        }
    }

    /// Creates a new stream read error
    pub fn stream_read(source: std::io::Error) -> Self {
        Self::StreamRead { source }
    }

    /// Returns true if the caller supplied input that was never handed to libmagic
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::FileNotFound { .. } | Self::StreamRead { .. }
        )
    }
}
