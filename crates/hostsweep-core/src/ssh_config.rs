//! Per-host connection settings from an OpenSSH client config
//!
//! Only the keywords that affect how a host is dialed are read: `Host`,
//! `HostName`, `User`, `Port` and `IdentityFile`. As with OpenSSH, the first
//! value obtained for a keyword wins and `IdentityFile` entries accumulate.
//! `Match` blocks are skipped.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::CoreError;

/// Settings found for one host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostConfigEntry {
    /// Canonical address to dial
    pub hostname: Option<String>,
    /// Default login user
    pub user: Option<String>,
    /// Port
    pub port: Option<u16>,
    /// Identity files in the order they were declared
    pub identity_files: Vec<String>,
}

/// Source of per-host connection defaults
pub trait HostConfigSource: Send + Sync {
    /// Look up the settings that apply to `host`
    fn lookup(&self, host: &str) -> HostConfigEntry;
}

/// Config source that knows nothing about any host
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHostConfig;

impl HostConfigSource for NoHostConfig {
    fn lookup(&self, _host: &str) -> HostConfigEntry {
        HostConfigEntry::default()
    }
}

#[derive(Debug, Clone, Default)]
struct HostBlock {
    patterns: Vec<String>,
    entry: HostConfigEntry,
}

/// Parsed OpenSSH client configuration
#[derive(Debug, Clone, Default)]
pub struct SshConfig {
    blocks: Vec<HostBlock>,
}

impl SshConfig {
    /// Parse config text
    #[must_use]
    pub fn parse(content: &str) -> Self {
        // settings before the first Host line apply to every host
        let mut blocks = vec![HostBlock {
            patterns: vec!["*".to_string()],
            entry: HostConfigEntry::default(),
        }];

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((keyword, value)) = split_keyword(line) else {
                debug!(line = idx + 1, "ignoring ssh config line without value");
                continue;
            };

            let keyword = keyword.to_ascii_lowercase();
            match keyword.as_str() {
                "host" => blocks.push(HostBlock {
                    patterns: value.split_whitespace().map(unquote).collect(),
                    entry: HostConfigEntry::default(),
                }),
                "match" => {
                    debug!(line = idx + 1, "Match blocks are not supported, skipping");
                    blocks.push(HostBlock::default());
                }
                _ => {
                    if let Some(block) = blocks.last_mut() {
                        apply_keyword(&mut block.entry, &keyword, value, idx + 1);
                    }
                }
            }
        }

        Self { blocks }
    }

    /// Load and parse a config file
    ///
    /// # Errors
    /// Returns `CoreError::SshConfig` if the file cannot be read
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::SshConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::parse(&content);
        debug!(path = %path.display(), blocks = config.blocks.len(), "loaded ssh config");
        Ok(config)
    }

    /// Load `~/.ssh/config`, or an empty config if it does not exist
    #[must_use]
    pub fn load_default() -> Self {
        let Some(path) = default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable ssh config");
                Self::default()
            }
        }
    }
}

impl HostConfigSource for SshConfig {
    fn lookup(&self, host: &str) -> HostConfigEntry {
        let mut merged = HostConfigEntry::default();

        for block in self
            .blocks
            .iter()
            .filter(|b| matches_host_patterns(host, &b.patterns))
        {
            let entry = &block.entry;
            if merged.hostname.is_none() {
                merged.hostname.clone_from(&entry.hostname);
            }
            if merged.user.is_none() {
                merged.user.clone_from(&entry.user);
            }
            if merged.port.is_none() {
                merged.port = entry.port;
            }
            merged
                .identity_files
                .extend(entry.identity_files.iter().cloned());
        }

        merged
    }
}

/// `~/.ssh/config`
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("config"))
}

fn split_keyword(line: &str) -> Option<(&str, &str)> {
    let end = line.find(|c: char| c.is_whitespace() || c == '=')?;
    let (keyword, rest) = line.split_at(end);
    let value = rest
        .trim_start_matches(|c: char| c.is_whitespace() || c == '=')
        .trim_end();
    if value.is_empty() {
        None
    } else {
        Some((keyword, value))
    }
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

fn apply_keyword(entry: &mut HostConfigEntry, keyword: &str, value: &str, line: usize) {
    match keyword {
        "hostname" => {
            if entry.hostname.is_none() {
                entry.hostname = Some(unquote(value));
            }
        }
        "user" => {
            if entry.user.is_none() {
                entry.user = Some(unquote(value));
            }
        }
        "port" => {
            if entry.port.is_none() {
                match value.parse() {
                    Ok(port) => entry.port = Some(port),
                    Err(_) => warn!(line, value, "invalid Port in ssh config"),
                }
            }
        }
        "identityfile" => entry.identity_files.push(unquote(value)),
        _ => {}
    }
}

/// Whether `host` matches a `Host` pattern list
///
/// At least one positive pattern must match and no `!` pattern may match.
fn matches_host_patterns(host: &str, patterns: &[String]) -> bool {
    let mut matched = false;
    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            if wildcard_match(host, negated) {
                return false;
            }
        } else if wildcard_match(host, pattern) {
            matched = true;
        }
    }
    matched
}

/// Case-insensitive glob match supporting `*` and `?`
fn wildcard_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();

    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            // let the last star swallow one more character
            p = star_p + 1;
            t = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# global defaults
User fallback

Host bastion
    HostName 203.0.113.10
    User jump
    Port 2222
    IdentityFile ~/.ssh/bastion_ed25519

Host web-* !web-legacy
    HostName %h.internal.example.com
    IdentityFile ~/.ssh/web_ed25519

Host *.example.com
    User=deploy
    IdentityFile "~/.ssh/id rsa"

Match host db*
    User ignored

Host *
    User wildcard
    IdentityFile ~/.ssh/id_ed25519
"#;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("web1.example.com", "web*.example.com"));
        assert!(wildcard_match("WEB1.example.com", "web*.EXAMPLE.com"));
        assert!(!wildcard_match("db1.example.com", "web*.example.com"));
        assert!(wildcard_match("test", "?est"));
        assert!(!wildcard_match("testing", "?est"));
        assert!(wildcard_match("anything", "*"));
        assert!(wildcard_match("", "*"));
        assert!(wildcard_match("abcbc", "*bc"));
    }

    #[test]
    fn test_negated_patterns() {
        let patterns = vec!["web-*".to_string(), "!web-legacy".to_string()];
        assert!(matches_host_patterns("web-1", &patterns));
        assert!(!matches_host_patterns("web-legacy", &patterns));
        assert!(!matches_host_patterns("db-1", &patterns));
    }

    #[test]
    fn test_first_value_wins() {
        let config = SshConfig::parse(SAMPLE);
        let entry = config.lookup("bastion");

        // global User precedes the Host block
        assert_eq!(entry.user.as_deref(), Some("fallback"));
        assert_eq!(entry.hostname.as_deref(), Some("203.0.113.10"));
        assert_eq!(entry.port, Some(2222));
        assert_eq!(
            entry.identity_files,
            vec!["~/.ssh/bastion_ed25519", "~/.ssh/id_ed25519"]
        );
    }

    #[test]
    fn test_equals_and_quotes() {
        let config =
            SshConfig::parse("Host a.example.com\n  User=deploy\n  IdentityFile \"~/k 1\"\n");
        let entry = config.lookup("a.example.com");
        assert_eq!(entry.user.as_deref(), Some("deploy"));
        assert_eq!(entry.identity_files, vec!["~/k 1"]);
    }

    #[test]
    fn test_match_blocks_are_skipped() {
        let config = SshConfig::parse("Match host db*\n  User ignored\n");
        assert_eq!(config.lookup("db1").user, None);
    }

    #[test]
    fn test_negated_host_falls_through() {
        let config = SshConfig::parse(SAMPLE);
        let entry = config.lookup("web-legacy");
        assert_eq!(entry.hostname, None);
        assert_eq!(entry.identity_files, vec!["~/.ssh/id_ed25519"]);
    }

    #[test]
    fn test_unknown_host_gets_wildcard_defaults() {
        let config = SshConfig::parse(SAMPLE);
        let entry = config.lookup("random");
        assert_eq!(entry.user.as_deref(), Some("fallback"));
        assert_eq!(entry.hostname, None);
        assert_eq!(entry.port, None);
    }

    #[test]
    fn test_no_host_config() {
        assert_eq!(NoHostConfig.lookup("anything"), HostConfigEntry::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SshConfig::load(Path::new("/nonexistent/ssh_config")).unwrap_err();
        assert!(matches!(err, CoreError::SshConfig { .. }));
    }
}
