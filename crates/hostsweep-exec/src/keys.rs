//! Identity file handling

use std::path::{Path, PathBuf};

use tracing::debug;

/// Identity file errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key file permissions too open: {0} (should be 600)")]
    BadPermissions(String),

    #[error("key file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Expand a leading `~` to the current user's home directory
///
/// Paths without a leading `~`, or when no home directory is known, are
/// returned unchanged.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    let rest = if path == "~" {
        ""
    } else if let Some(rest) = path.strip_prefix("~/") {
        rest
    } else {
        return PathBuf::from(path);
    };

    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Check that an identity file exists and is not readable by others
///
/// # Errors
/// Returns `KeyError::NotFound` if the file is missing and
/// `KeyError::BadPermissions` if group/other bits are set.
pub fn validate_identity_file(path: &Path) -> Result<(), KeyError> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(KeyError::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(KeyError::Io(e)),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        // group and other bits must be clear
        if metadata.permissions().mode() & 0o77 != 0 {
            return Err(KeyError::BadPermissions(path.display().to_string()));
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;

    debug!(path = %path.display(), "identity file ok");
    Ok(())
}
