//! Error types for hostsweep-collect

use hostsweep_core::ParseError;
use thiserror::Error;

/// A metric could not be read from command output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    /// The command exited non-zero
    #[error("{0}")]
    CommandFailed(String),

    /// Output did not have the expected shape
    #[error("failed to parse {metric}: {reason}")]
    Malformed {
        /// Metric being parsed
        metric: &'static str,
        /// What was wrong
        reason: String,
    },
}

impl MetricError {
    pub(crate) fn malformed(metric: &'static str, reason: impl Into<String>) -> Self {
        MetricError::Malformed {
            metric,
            reason: reason.into(),
        }
    }
}

impl From<MetricError> for ParseError {
    fn from(err: MetricError) -> Self {
        ParseError::new(err.to_string())
    }
}

/// Errors from selecting a collector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectError {
    /// Unknown collector name
    #[error("unknown collector {0:?} (expected one of: facts, metrics)")]
    UnknownCollector(String),
}
