//! Core error types for hostsweep-core

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in core operations
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Connection parameters could not be determined
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Host list file could not be read
    #[error("failed to read host file {path}: {reason}")]
    HostFile {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },

    /// SSH client config could not be read
    #[error("failed to read ssh config {path}: {reason}")]
    SshConfig {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },

    /// A host reported a second result
    #[error("duplicate result for host {0}")]
    DuplicateResult(String),

    /// Actor communication error
    #[error("actor communication error: {0}")]
    ActorError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Required connection parameters could not be determined for a host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Host token is empty or malformed
    #[error("invalid host specifier {token:?}: {reason}")]
    InvalidHostSpec {
        /// Token as given
        token: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// No username from any source
    #[error("no username for host {host} (use user@host, --username, ssh config, or $USER)")]
    MissingUsername {
        /// Host token
        host: String,
    },

    /// Hostname resolved to an empty string
    #[error("empty hostname for host {host}")]
    MissingHostname {
        /// Host token
        host: String,
    },
}

/// Command output could not be interpreted
///
/// Returned by executors as a value and stored in the command's record; it
/// never aborts a host run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    /// Human-readable reason
    pub message: String,
}

impl ParseError {
    /// Create a parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
