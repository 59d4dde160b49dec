//! Result and parameter types shared by all transports

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Output of a remote process that ran to completion
///
/// A non-zero `status` is still a completed command; only the transport
/// decides whether a command failed to run at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Exit status code (0 for success)
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandOutput {
    /// Check if the remote process exited with status 0
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Combine stdout and stderr
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Fully resolved parameters for connecting to one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Host token as given by the caller, used as the report key
    pub host: String,
    /// Address actually dialed (may differ from `host` via ssh config)
    pub hostname: String,
    /// Port (default 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login user
    pub username: String,
    /// Optional private key path
    pub identity_file: Option<PathBuf>,
    /// Timeout for establishing the connection
    pub connect_timeout: Duration,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl ConnectionParams {
    /// Create params where the report key and the dialed address are the same
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            hostname: host.clone(),
            host,
            port: DEFAULT_SSH_PORT,
            username: username.into(),
            identity_file: None,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Set the address to dial
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set identity file path
    #[must_use]
    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
