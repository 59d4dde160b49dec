//! Configuration loading and types

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::WrapErr;
use hostsweep_collect::CollectorKind;
use hostsweep_core::{CredentialOverrides, EngineConfig};
use hostsweep_exec::expand_tilde;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Top-level configuration, read from `hostsweep.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Concurrency and timeouts
    #[serde(default)]
    pub engine: EngineConfig,
    /// Credentials and per-host config source
    #[serde(default)]
    pub ssh: SshSettings,
    /// Collector used when `--collector` is not given
    #[serde(default)]
    pub collector: CollectorKind,
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// `[ssh]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshSettings {
    /// OpenSSH client config; `~/.ssh/config` when unset
    pub config_path: Option<PathBuf>,
    /// Username for every host
    pub username: Option<String>,
    /// Identity file for every host
    pub identity_file: Option<PathBuf>,
}

impl SshSettings {
    /// Global credential overrides, with `~` expanded
    #[must_use]
    pub fn overrides(&self) -> CredentialOverrides {
        CredentialOverrides {
            username: self.username.clone(),
            identity_file: self.identity_file.as_deref().map(expand_path),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            ssh: SshSettings::default(),
            collector: CollectorKind::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Expand a leading `~` in a configured path
pub fn expand_path(path: &Path) -> PathBuf {
    expand_tilde(&path.to_string_lossy())
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .wrap_err_with(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from an explicit path, then the default paths, else defaults
    ///
    /// `explicit` covers both `--config` and `$HOSTSWEEP_CONFIG`.
    ///
    /// # Errors
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_default(explicit: Option<&Path>) -> eyre::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let paths = [
            Some(PathBuf::from("hostsweep.toml")),
            dirs::config_dir().map(|p| p.join("hostsweep/hostsweep.toml")),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(&path);
            }
        }

        Ok(Config::default())
    }

    /// Fold command-line flags over file values
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(workers) = cli.workers {
            self.engine.concurrency = workers;
        }
        if let Some(secs) = cli.connect_timeout {
            self.engine.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = cli.command_timeout {
            self.engine.command_timeout = Duration::from_secs(secs);
        }
        if let Some(collector) = cli.collector {
            self.collector = collector;
        }
        if let Some(username) = &cli.username {
            self.ssh.username = Some(username.clone());
        }
        if let Some(identity_file) = &cli.identity_file {
            self.ssh.identity_file = Some(identity_file.clone());
        }
        if let Some(ssh_config) = &cli.ssh_config {
            self.ssh.config_path = Some(ssh_config.clone());
        }
    }
}
