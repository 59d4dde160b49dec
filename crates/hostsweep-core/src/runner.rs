//! Single-host orchestration
//!
//! Resolve, connect, run every command in order, close. Per-command failures
//! are recorded and never stop the run; a connection failure stops it before
//! any command is attempted.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use hostsweep_exec::{RemoteSession, Transport};
use tracing::{Span, debug, info, instrument, warn};

use crate::config::DEFAULT_COMMAND_TIMEOUT;
use crate::executor::CommandExecutor;
use crate::report::{CommandRecord, HostResult, HostStatus};
use crate::resolver::ConnectionResolver;

/// Runs one executor against one host
#[derive(Clone)]
pub struct HostRunner {
    resolver: ConnectionResolver,
    transport: Arc<dyn Transport>,
    command_timeout: Duration,
}

impl std::fmt::Debug for HostRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostRunner")
            .field("resolver", &self.resolver)
            .field("transport", &self.transport.transport_type())
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl HostRunner {
    /// Create a runner
    pub fn new(resolver: ConnectionResolver, transport: Arc<dyn Transport>) -> Self {
        Self {
            resolver,
            transport,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Set connect timeout for every resolved host
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.resolver = self.resolver.with_connect_timeout(timeout);
        self
    }

    /// Set per-command timeout
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Run `executor` against `host` and return the finished result
    ///
    /// The session is closed on every path. If the executor panics, the
    /// session is closed first and the panic then continues to unwind.
    #[instrument(name = "host", skip(self, executor), fields(executor = executor.name()))]
    pub async fn run(&self, host: &str, executor: &dyn CommandExecutor) -> HostResult {
        let started_at = Utc::now();

        let params = match self.resolver.resolve(host) {
            Ok(params) => params,
            Err(e) => {
                warn!(error = %e, "could not resolve connection parameters");
                return HostResult::failed(host, HostStatus::Unresolved, e.to_string(), started_at);
            }
        };

        let mut session = RemoteSession::new(Arc::clone(&self.transport), params, &Span::current());

        if let Err(e) = session.connect().await {
            warn!(error = %e, "host unreachable");
            session.close().await;
            return HostResult::failed(host, HostStatus::Unreachable, e.to_string(), started_at);
        }

        let commands = AssertUnwindSafe(self.run_commands(&mut session, executor))
            .catch_unwind()
            .await;

        session.close().await;

        match commands {
            Ok(commands) => {
                let result = HostResult::connected(host, commands, started_at);
                info!(status = %result.status, "host finished");
                result
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn run_commands(
        &self,
        session: &mut RemoteSession,
        executor: &dyn CommandExecutor,
    ) -> Vec<CommandRecord> {
        let commands = executor.commands();
        let mut records = Vec::with_capacity(commands.len());

        for command in commands {
            let record = match session.run(&command, self.command_timeout).await {
                Ok(output) => {
                    let parsed = executor.parse_response(&command, &output);
                    if let Err(e) = &parsed {
                        debug!(command = %command, error = %e, "could not parse output");
                    }
                    CommandRecord::completed(command, output, parsed)
                }
                Err(e) => {
                    warn!(
                        command = %command,
                        error = %e,
                        timed_out = e.is_timeout(),
                        "command failed"
                    );
                    CommandRecord::failed(command, e.to_string())
                }
            };
            records.push(record);
        }

        records
    }
}
