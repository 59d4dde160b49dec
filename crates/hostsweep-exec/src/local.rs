//! Local command execution using `tokio::process`

use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::ExecError;
use crate::result::{CommandOutput, ConnectionParams};
use crate::traits::{Transport, TransportHandle};

/// Local transport
///
/// "Connects" without any network activity and runs every command through
/// `sh -c` on the local machine. Useful for `localhost` entries and tests.
#[derive(Debug, Clone, Default)]
pub struct LocalTransport;

impl LocalTransport {
    /// Create a new local transport
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn TransportHandle>, ExecError> {
        debug!(host = %params.host, "opening local shell transport");
        Ok(Box::new(LocalHandle))
    }

    fn transport_type(&self) -> &'static str {
        "local"
    }
}

struct LocalHandle;

#[async_trait]
impl TransportHandle for LocalHandle {
    #[instrument(skip(self), level = "debug")]
    async fn run(&mut self, cmd: &str) -> Result<CommandOutput, ExecError> {
        let start = Instant::now();

        // Use shell to support pipes, redirections, etc.
        let child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::ChannelError(e.to_string()))?;

        let duration = start.elapsed();
        let status = output.status.code().unwrap_or(-1);

        debug!(
            command = %cmd,
            status = status,
            duration = ?duration,
            "command completed"
        );

        Ok(CommandOutput {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration,
        })
    }

    async fn disconnect(&mut self) -> Result<(), ExecError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn handle() -> Box<dyn TransportHandle> {
        LocalTransport::new()
            .connect(&ConnectionParams::new("localhost", "me"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_success() {
        let mut handle = handle().await;
        let result = handle.run("echo hello").await.unwrap();

        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_nonzero_exit_is_output() {
        let mut handle = handle().await;
        let result = handle.run("exit 42").await.unwrap();

        assert!(!result.success());
        assert_eq!(result.status, 42);
    }

    #[tokio::test]
    async fn test_run_with_stderr() {
        let mut handle = handle().await;
        let result = handle.run("echo error >&2").await.unwrap();

        assert!(result.success());
        assert_eq!(result.stderr.trim(), "error");
    }
}
