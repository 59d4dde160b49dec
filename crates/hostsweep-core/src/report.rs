//! Per-host and fleet-wide result types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hostsweep_exec::CommandOutput;
use kameo_macros::Reply;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// What happened when one command was attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The remote process ran to completion (any exit status)
    Completed(CommandOutput),
    /// The command could not be run (timeout or transport fault)
    Failed {
        /// Error description
        error: String,
    },
}

impl CommandOutcome {
    /// Exit status, if the command completed
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandOutcome::Completed(output) => Some(output.status),
            CommandOutcome::Failed { .. } => None,
        }
    }
}

/// One command's outcome plus the executor's interpretation of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Command text
    pub command: String,
    /// Raw outcome
    pub outcome: CommandOutcome,
    /// Structured payload produced by the executor
    pub parsed: Option<serde_json::Value>,
    /// Why the executor could not interpret the output
    pub parse_error: Option<String>,
    /// Completed with exit status 0
    pub success: bool,
}

impl CommandRecord {
    /// Record a completed command and the executor's parse result
    #[must_use]
    pub fn completed(
        command: impl Into<String>,
        output: CommandOutput,
        parsed: Result<serde_json::Value, ParseError>,
    ) -> Self {
        let (parsed, parse_error) = match parsed {
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(e.message)),
        };
        let success = output.success();

        Self {
            command: command.into(),
            outcome: CommandOutcome::Completed(output),
            parsed,
            parse_error,
            success,
        }
    }

    /// Record a command that could not be run
    #[must_use]
    pub fn failed(command: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            outcome: CommandOutcome::Failed {
                error: error.into(),
            },
            parsed: None,
            parse_error: None,
            success: false,
        }
    }

    /// Human-readable reason this command did not succeed
    #[must_use]
    pub fn failure_reason(&self) -> Option<String> {
        if self.success {
            return None;
        }
        match &self.outcome {
            CommandOutcome::Failed { error } => Some(error.clone()),
            CommandOutcome::Completed(output) if output.stderr.trim().is_empty() => {
                Some(format!("exited with status {}", output.status))
            }
            CommandOutcome::Completed(output) => Some(format!(
                "exited with status {}: {}",
                output.status,
                output.stderr.trim()
            )),
        }
    }
}

/// Overall outcome of one host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    /// Connected and every command succeeded
    Succeeded,
    /// Connected, but at least one command failed
    Partial,
    /// Connection could not be established; no command was attempted
    Unreachable,
    /// Connection parameters could not be determined
    Unresolved,
    /// The host's task failed unexpectedly
    Crashed,
}

impl std::fmt::Display for HostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HostStatus::Succeeded => "succeeded",
            HostStatus::Partial => "partial",
            HostStatus::Unreachable => "unreachable",
            HostStatus::Unresolved => "unresolved",
            HostStatus::Crashed => "crashed",
        };
        f.write_str(s)
    }
}

/// Result of running one executor against one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostResult {
    /// Host token as requested
    pub host: String,
    /// Overall outcome
    pub status: HostStatus,
    /// Connected and every command succeeded
    pub success: bool,
    /// Host-level error (resolution, connection, or crash)
    pub error: Option<String>,
    /// Command records in declared order
    pub commands: Vec<CommandRecord>,
    /// When the host run started
    pub started_at: DateTime<Utc>,
    /// When the host run finished
    pub finished_at: DateTime<Utc>,
}

impl HostResult {
    /// Result for a host that connected and ran its commands
    #[must_use]
    pub fn connected(
        host: impl Into<String>,
        commands: Vec<CommandRecord>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let success = commands.iter().all(|c| c.success);
        Self {
            host: host.into(),
            status: if success {
                HostStatus::Succeeded
            } else {
                HostStatus::Partial
            },
            success,
            error: None,
            commands,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Result for a host that never got to run a command
    #[must_use]
    pub fn failed(
        host: impl Into<String>,
        status: HostStatus,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            host: host.into(),
            status,
            success: false,
            error: Some(error.into()),
            commands: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Look up a command's record by its text
    #[must_use]
    pub fn command(&self, command: &str) -> Option<&CommandRecord> {
        self.commands.iter().find(|c| c.command == command)
    }

    /// Commands that did not succeed
    pub fn failed_commands(&self) -> impl Iterator<Item = &CommandRecord> {
        self.commands.iter().filter(|c| !c.success)
    }
}

/// Host counts by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSummary {
    /// Hosts in the report
    pub total: usize,
    /// Hosts where everything succeeded
    pub succeeded: usize,
    /// Reachable hosts with at least one failed command
    pub partial: usize,
    /// Hosts that could not be connected to
    pub unreachable: usize,
    /// Hosts whose parameters could not be resolved
    pub unresolved: usize,
    /// Hosts whose task failed unexpectedly
    pub crashed: usize,
}

impl FleetSummary {
    /// Fraction of hosts that fully succeeded, 0.0 for an empty fleet
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }
}

/// Results of one engine run, one entry per requested host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Reply)]
pub struct AggregateReport {
    /// Host results in completion order
    pub results: Vec<HostResult>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last host finished
    pub finished_at: DateTime<Utc>,
}

impl AggregateReport {
    /// Number of hosts in the report
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the report has no hosts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Look up a host's result
    #[must_use]
    pub fn get(&self, host: &str) -> Option<&HostResult> {
        self.results.iter().find(|r| r.host == host)
    }

    /// Whether every host fully succeeded
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    /// Fraction of hosts that fully succeeded
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        self.summary().success_rate()
    }

    /// Count hosts by outcome
    #[must_use]
    pub fn summary(&self) -> FleetSummary {
        let counts: HashMap<HostStatus, usize> =
            self.results.iter().fold(HashMap::new(), |mut acc, r| {
                *acc.entry(r.status).or_default() += 1;
                acc
            });
        let count = |status| counts.get(&status).copied().unwrap_or(0);

        FleetSummary {
            total: self.results.len(),
            succeeded: count(HostStatus::Succeeded),
            partial: count(HostStatus::Partial),
            unreachable: count(HostStatus::Unreachable),
            unresolved: count(HostStatus::Unresolved),
            crashed: count(HostStatus::Crashed),
        }
    }

    /// Sort results by host token, for stable presentation
    pub fn sort_by_host(&mut self) {
        self.results.sort_by(|a, b| a.host.cmp(&b.host));
    }
}
