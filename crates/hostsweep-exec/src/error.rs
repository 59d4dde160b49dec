//! Error types for hostsweep-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to a remote host
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Failed to reach the remote host
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Connection was not established within the connect timeout
    #[error("connection timed out after {timeout:?}")]
    ConnectTimeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Command did not terminate within the command timeout
    #[error("command timed out after {timeout:?}")]
    CommandTimeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Transport fault while a command was running
    #[error("channel error: {0}")]
    ChannelError(String),

    /// SSH key error
    #[error("SSH key error: {0}")]
    SshKeyError(String),

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// Connection not established
    #[error("not connected")]
    NotConnected,

    /// Session was already closed
    #[error("session closed")]
    SessionClosed,
}

impl ExecError {
    /// Whether this error happened while establishing the connection
    #[must_use]
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            ExecError::ConnectionFailed(_)
                | ExecError::AuthenticationFailed(_)
                | ExecError::ConnectTimeout { .. }
                | ExecError::SshKeyError(_)
        )
    }

    /// Whether this error is a timeout
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ExecError::ConnectTimeout { .. } | ExecError::CommandTimeout { .. }
        )
    }
}
