//! Command executor contract
//!
//! A [`CommandExecutor`] says which commands to run on a host and how to
//! interpret their output. It never touches connections; [`HostRunner`]
//! drives it.
//!
//! [`HostRunner`]: crate::runner::HostRunner

use hostsweep_exec::CommandOutput;

use crate::error::ParseError;

/// Per-task policy: the commands to run and how to read their output
pub trait CommandExecutor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Commands to run, in order
    ///
    /// Called once per host run.
    fn commands(&self) -> Vec<String>;

    /// Interpret the output of one completed command
    ///
    /// Called for every command that ran to completion, including non-zero
    /// exits. Must be a pure function of its inputs; output that cannot be
    /// interpreted is reported as `Err(ParseError)`.
    ///
    /// # Errors
    /// Returns `ParseError` when the output does not have the expected shape
    fn parse_response(
        &self,
        command: &str,
        output: &CommandOutput,
    ) -> Result<serde_json::Value, ParseError>;
}

/// Builds one executor per host
pub trait ExecutorFactory: Send + Sync {
    /// Create the executor that will run against `host`
    fn create(&self, host: &str) -> Box<dyn CommandExecutor>;
}

impl<F> ExecutorFactory for F
where
    F: Fn(&str) -> Box<dyn CommandExecutor> + Send + Sync,
{
    fn create(&self, host: &str) -> Box<dyn CommandExecutor> {
        self(host)
    }
}
