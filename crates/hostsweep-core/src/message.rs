//! Message types for actor communication
//!
//! Message handlers are implemented in their respective actor modules.

use crate::report::HostResult;

/// Record one finished host
///
/// Replies `Err(CoreError::DuplicateResult)` if the host was already recorded;
/// the first result is kept.
#[derive(Debug)]
pub struct RecordHostResult(pub HostResult);

/// Close the run and produce the aggregate report
///
/// Any host in `expected` without a recorded result is reported as crashed.
#[derive(Debug)]
pub struct FinishReport {
    /// Every host token the run was started with
    pub expected: Vec<String>,
}

/// Number of results recorded so far
#[derive(Debug)]
pub struct RecordedCount;
