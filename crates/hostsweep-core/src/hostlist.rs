//! Host list files
//!
//! One host token per line. Blank lines and lines starting with `#` are
//! skipped; nothing else is validated here, malformed tokens surface later as
//! per-host resolution failures.

use std::path::Path;

use tracing::debug;

use crate::error::CoreError;

/// Parse host list text into tokens
#[must_use]
pub fn parse_host_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

/// Read a host list file
///
/// # Errors
/// Returns `CoreError::HostFile` if the file cannot be read
pub fn read_host_file(path: &Path) -> Result<Vec<String>, CoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::HostFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let hosts = parse_host_list(&content);
    debug!(path = %path.display(), count = hosts.len(), "read host file");
    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let content = "\
# production web tier
web1

  web2.example.com
#db1
ops@db2
\t
";
        assert_eq!(
            parse_host_list(content),
            vec!["web1", "web2.example.com", "ops@db2"]
        );
    }

    #[test]
    fn test_malformed_tokens_pass_through() {
        assert_eq!(parse_host_list("@\nuser@\n"), vec!["@", "user@"]);
    }

    #[test]
    fn test_read_host_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a\n# b\nc").unwrap();

        let hosts = read_host_file(file.path()).unwrap();
        assert_eq!(hosts, vec!["a", "c"]);
    }

    #[test]
    fn test_missing_host_file() {
        let err = read_host_file(Path::new("/nonexistent/hosts.txt")).unwrap_err();
        assert!(matches!(err, CoreError::HostFile { .. }));
    }
}
