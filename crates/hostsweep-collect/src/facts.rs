//! System facts collector

use hostsweep_core::{CommandExecutor, ParseError};
use hostsweep_exec::CommandOutput;
use serde::{Deserialize, Serialize};

const COMMANDS: [&str; 3] = ["hostname", "uname -a", "uptime"];

/// Raw output of one fact command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// Command that produced it
    pub command: String,
    /// Trimmed stdout
    pub output: String,
    /// Trimmed stderr, if any
    pub error: Option<String>,
}

impl Fact {
    fn from_output(command: &str, output: &CommandOutput) -> Self {
        let stderr = output.stderr.trim();
        Self {
            command: command.to_string(),
            output: output.stdout.trim().to_string(),
            error: (!stderr.is_empty()).then(|| stderr.to_string()),
        }
    }
}

/// Collects hostname, kernel and uptime as text
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFacts;

impl CommandExecutor for SystemFacts {
    fn name(&self) -> &str {
        "facts"
    }

    fn commands(&self) -> Vec<String> {
        COMMANDS.iter().map(|c| (*c).to_string()).collect()
    }

    fn parse_response(
        &self,
        command: &str,
        output: &CommandOutput,
    ) -> Result<serde_json::Value, ParseError> {
        serde_json::to_value(Fact::from_output(command, output))
            .map_err(|e| ParseError::new(e.to_string()))
    }
}
