//! Connection parameter resolution
//!
//! Turns a host token plus optional overrides into [`ConnectionParams`].
//!
//! Username precedence, highest first:
//! 1. explicit override
//! 2. `user@` in the host token
//! 3. `User` from the per-host config source
//! 4. ambient default user (`$USER` / `$LOGNAME`)
//!
//! Identity precedence: explicit override, then the first `IdentityFile` from
//! the config source, then none.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hostsweep_exec::{ConnectionParams, DEFAULT_SSH_PORT, expand_tilde};
use tracing::{debug, instrument};

use crate::config::{CredentialOverrides, DEFAULT_CONNECT_TIMEOUT};
use crate::error::ResolutionError;
use crate::ssh_config::{HostConfigSource, NoHostConfig};

/// A parsed host token, optionally `user@host`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    raw: String,
    user: Option<String>,
    host: String,
}

impl HostSpec {
    /// Parse a host token
    ///
    /// # Errors
    /// Returns `ResolutionError::InvalidHostSpec` for an empty token, an empty
    /// user or host part, or a token containing whitespace.
    pub fn parse(token: &str) -> Result<Self, ResolutionError> {
        let invalid = |reason| ResolutionError::InvalidHostSpec {
            token: token.to_string(),
            reason,
        };

        if token.is_empty() {
            return Err(invalid("empty host token"));
        }
        if token.chars().any(char::is_whitespace) {
            return Err(invalid("host token contains whitespace"));
        }

        let (user, host) = match token.split_once('@') {
            Some(("", _)) => return Err(invalid("empty user before '@'")),
            Some((_, "")) => return Err(invalid("empty host after '@'")),
            Some((user, host)) => (Some(user.to_string()), host.to_string()),
            None => (None, token.to_string()),
        };

        Ok(Self {
            raw: token.to_string(),
            user,
            host,
        })
    }

    /// Token exactly as given; the report key for this host
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// User embedded in the token
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Host part of the token
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl std::fmt::Display for HostSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Resolves host tokens into connection parameters
#[derive(Clone)]
pub struct ConnectionResolver {
    config_source: Arc<dyn HostConfigSource>,
    overrides: CredentialOverrides,
    default_user: Option<String>,
    connect_timeout: Duration,
}

impl std::fmt::Debug for ConnectionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionResolver")
            .field("overrides", &self.overrides)
            .field("default_user", &self.default_user)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for ConnectionResolver {
    fn default() -> Self {
        Self::new(Arc::new(NoHostConfig))
    }
}

impl ConnectionResolver {
    /// Create a resolver backed by `config_source`
    ///
    /// The ambient default user is read from the environment once, here.
    pub fn new(config_source: Arc<dyn HostConfigSource>) -> Self {
        Self {
            config_source,
            overrides: CredentialOverrides::default(),
            default_user: ambient_user(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Apply global username/identity overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: CredentialOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Replace the ambient default user
    #[must_use]
    pub fn with_default_user(mut self, user: Option<String>) -> Self {
        self.default_user = user;
        self
    }

    /// Set connect timeout carried in resolved params
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Resolve a host token into connection parameters
    ///
    /// # Errors
    /// Returns a `ResolutionError` if the token is malformed or no username
    /// can be found.
    #[instrument(skip(self))]
    pub fn resolve(&self, token: &str) -> Result<ConnectionParams, ResolutionError> {
        let spec = HostSpec::parse(token)?;
        self.resolve_spec(&spec)
    }

    /// Resolve an already parsed host spec
    ///
    /// # Errors
    /// Returns `ResolutionError::MissingUsername` or
    /// `ResolutionError::MissingHostname`.
    pub fn resolve_spec(&self, spec: &HostSpec) -> Result<ConnectionParams, ResolutionError> {
        let entry = self.config_source.lookup(spec.host());

        let hostname = entry
            .hostname
            .map(|h| h.replace("%h", spec.host()))
            .unwrap_or_else(|| spec.host().to_string());
        if hostname.is_empty() {
            return Err(ResolutionError::MissingHostname {
                host: spec.as_str().to_string(),
            });
        }

        let (username, user_source) = if let Some(user) = &self.overrides.username {
            (Some(user.clone()), "override")
        } else if let Some(user) = spec.user() {
            (Some(user.to_string()), "host token")
        } else if let Some(user) = entry.user {
            (Some(user), "ssh config")
        } else {
            (self.default_user.clone(), "ambient")
        };

        let username = username
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ResolutionError::MissingUsername {
                host: spec.as_str().to_string(),
            })?;

        let identity_file: Option<PathBuf> = match &self.overrides.identity_file {
            Some(path) => Some(path.clone()),
            None => entry
                .identity_files
                .first()
                .map(|path| expand_tilde(path)),
        };

        debug!(
            host = %spec,
            hostname = %hostname,
            username = %username,
            user_source,
            identity = ?identity_file,
            "resolved connection parameters"
        );

        Ok(ConnectionParams {
            host: spec.as_str().to_string(),
            hostname,
            port: entry.port.unwrap_or(DEFAULT_SSH_PORT),
            username,
            identity_file,
            connect_timeout: self.connect_timeout,
        })
    }
}

/// Login name of the current process owner, if known
fn ambient_user() -> Option<String> {
    ["USER", "LOGNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ssh_config::{HostConfigEntry, SshConfig};

    /// Config source returning one fixed entry and counting lookups
    #[derive(Default)]
    struct FixedConfig {
        entry: HostConfigEntry,
        lookups: AtomicUsize,
    }

    impl HostConfigSource for FixedConfig {
        fn lookup(&self, _host: &str) -> HostConfigEntry {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.entry.clone()
        }
    }

    fn config_with_user(user: &str) -> Arc<FixedConfig> {
        Arc::new(FixedConfig {
            entry: HostConfigEntry {
                user: Some(user.to_string()),
                ..HostConfigEntry::default()
            },
            lookups: AtomicUsize::new(0),
        })
    }

    fn resolver(source: Arc<FixedConfig>) -> ConnectionResolver {
        ConnectionResolver::new(source).with_default_user(Some("ambient".to_string()))
    }

    #[test]
    fn test_parse_host_spec() {
        let spec = HostSpec::parse("ops@web1").unwrap();
        assert_eq!(spec.user(), Some("ops"));
        assert_eq!(spec.host(), "web1");
        assert_eq!(spec.as_str(), "ops@web1");

        let spec = HostSpec::parse("web1").unwrap();
        assert_eq!(spec.user(), None);
        assert_eq!(spec.host(), "web1");
    }

    #[test]
    fn test_parse_invalid_host_spec() {
        for token in ["", "@web1", "ops@", "web 1"] {
            assert!(
                matches!(
                    HostSpec::parse(token),
                    Err(ResolutionError::InvalidHostSpec { .. })
                ),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_override_beats_everything() {
        let resolver = resolver(config_with_user("from-config")).with_overrides(
            CredentialOverrides {
                username: Some("explicit".to_string()),
                identity_file: None,
            },
        );
        let params = resolver.resolve("token-user@web1").unwrap();
        assert_eq!(params.username, "explicit");
    }

    #[test]
    fn test_host_token_user_beats_config() {
        let params = resolver(config_with_user("from-config"))
            .resolve("token-user@web1")
            .unwrap();
        assert_eq!(params.username, "token-user");
        assert_eq!(params.host, "token-user@web1");
        assert_eq!(params.hostname, "web1");
    }

    #[test]
    fn test_config_user_beats_ambient() {
        let params = resolver(config_with_user("from-config"))
            .resolve("web1")
            .unwrap();
        assert_eq!(params.username, "from-config");
    }

    #[test]
    fn test_ambient_user_is_last_resort() {
        let params = resolver(Arc::new(FixedConfig::default()))
            .resolve("web1")
            .unwrap();
        assert_eq!(params.username, "ambient");
    }

    #[test]
    fn test_missing_username_fails() {
        let resolver = ConnectionResolver::new(Arc::new(FixedConfig::default()))
            .with_default_user(None);
        assert_eq!(
            resolver.resolve("web1"),
            Err(ResolutionError::MissingUsername {
                host: "web1".to_string()
            })
        );
    }

    #[test]
    fn test_canonical_hostname_keeps_report_key() {
        let config = SshConfig::parse(
            "Host web1\n  HostName 10.1.2.3\n  Port 2200\n\nHost db*\n  HostName %h.internal\n",
        );
        let resolver =
            ConnectionResolver::new(Arc::new(config)).with_default_user(Some("me".to_string()));

        let params = resolver.resolve("ops@web1").unwrap();
        assert_eq!(params.host, "ops@web1");
        assert_eq!(params.hostname, "10.1.2.3");
        assert_eq!(params.port, 2200);

        let params = resolver.resolve("db7").unwrap();
        assert_eq!(params.hostname, "db7.internal");
        assert_eq!(params.port, DEFAULT_SSH_PORT);
    }

    #[test]
    fn test_identity_precedence() {
        let source = Arc::new(FixedConfig {
            entry: HostConfigEntry {
                identity_files: vec!["/keys/first".to_string(), "/keys/second".to_string()],
                ..HostConfigEntry::default()
            },
            lookups: AtomicUsize::new(0),
        });

        let params = resolver(Arc::clone(&source)).resolve("web1").unwrap();
        assert_eq!(params.identity_file, Some(PathBuf::from("/keys/first")));

        let params = resolver(source)
            .with_overrides(CredentialOverrides {
                username: None,
                identity_file: Some(PathBuf::from("/keys/explicit")),
            })
            .resolve("web1")
            .unwrap();
        assert_eq!(params.identity_file, Some(PathBuf::from("/keys/explicit")));

        let params = resolver(Arc::new(FixedConfig::default()))
            .resolve("web1")
            .unwrap();
        assert_eq!(params.identity_file, None);
    }

    #[test]
    fn test_config_source_queried_once() {
        let source = config_with_user("u");
        resolver(Arc::clone(&source)).resolve("web1").unwrap();
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connect_timeout_carried() {
        let params = resolver(Arc::new(FixedConfig::default()))
            .with_connect_timeout(Duration::from_secs(3))
            .resolve("web1")
            .unwrap();
        assert_eq!(params.connect_timeout, Duration::from_secs(3));
    }
}
