//! Configuration types for fleet runs

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default number of hosts processed concurrently
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default timeout for establishing a connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for a single command
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of hosts running at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Timeout for establishing each connection
    #[serde(default = "default_connect_timeout", with = "secs")]
    pub connect_timeout: Duration,
    /// Timeout for each command
    #[serde(default = "default_command_timeout", with = "secs")]
    pub command_timeout: Duration,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_command_timeout() -> Duration {
    DEFAULT_COMMAND_TIMEOUT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Set concurrency limit
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set per-command timeout
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Check that all limits are usable
    ///
    /// # Errors
    /// Returns `CoreError::ConfigError` for a zero concurrency or zero timeout
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.concurrency == 0 {
            return Err(CoreError::ConfigError(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(CoreError::ConfigError(
                "connect timeout must be positive".to_string(),
            ));
        }
        if self.command_timeout.is_zero() {
            return Err(CoreError::ConfigError(
                "command timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Global credential overrides applied to every host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOverrides {
    /// Username used for every host, beats `user@host`
    pub username: Option<String>,
    /// Identity file used for every host
    pub identity_file: Option<PathBuf>,
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
