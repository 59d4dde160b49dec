//! Single-host session lifecycle
//!
//! A [`RemoteSession`] owns at most one live transport handle and moves
//! through `Disconnected -> Connected -> Closed`. Every operation takes
//! `&mut self`, so a session can only ever run one command at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{Instrument, Span, debug, debug_span, error, warn};

use crate::error::ExecError;
use crate::result::{CommandOutput, ConnectionParams};
use crate::traits::{Transport, TransportHandle};

/// Lifecycle state of a [`RemoteSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// One connection to one host, owned by exactly one task
pub struct RemoteSession {
    transport: Arc<dyn Transport>,
    params: ConnectionParams,
    handle: Option<Box<dyn TransportHandle>>,
    state: SessionState,
    span: Span,
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("transport", &self.transport.transport_type())
            .field("params", &self.params)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl RemoteSession {
    /// Create a disconnected session
    ///
    /// Log events emitted by the session are recorded under a `session` span
    /// parented to `parent`, so concurrent hosts never share log context.
    pub fn new(transport: Arc<dyn Transport>, params: ConnectionParams, parent: &Span) -> Self {
        let span = debug_span!(
            parent: parent,
            "session",
            hostname = %params.hostname,
            port = params.port,
            user = %params.username,
        );

        Self {
            transport,
            params,
            handle: None,
            state: SessionState::Disconnected,
            span,
        }
    }

    /// Get connection parameters
    #[must_use]
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Get current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Establish the connection within `params.connect_timeout`
    ///
    /// Connecting an already connected session is a no-op.
    ///
    /// # Errors
    /// Returns `ExecError::ConnectTimeout` if the timeout elapses,
    /// `ExecError::SessionClosed` if the session was closed, or the
    /// transport's connection/authentication error.
    pub async fn connect(&mut self) -> Result<(), ExecError> {
        match self.state {
            SessionState::Connected => return Ok(()),
            SessionState::Closed => return Err(ExecError::SessionClosed),
            SessionState::Disconnected => {}
        }

        let connect_timeout = self.params.connect_timeout;
        let start = Instant::now();

        let result = timeout(connect_timeout, self.transport.connect(&self.params))
            .instrument(self.span.clone())
            .await;

        match result {
            Ok(Ok(handle)) => {
                self.handle = Some(handle);
                self.state = SessionState::Connected;
                self.span.in_scope(|| {
                    debug!(elapsed = ?start.elapsed(), "session connected");
                });
                Ok(())
            }
            Ok(Err(e)) => {
                self.span.in_scope(|| warn!(error = %e, "connect failed"));
                Err(e)
            }
            Err(_) => {
                self.span.in_scope(|| {
                    warn!(timeout = ?connect_timeout, "connect timed out");
                });
                Err(ExecError::ConnectTimeout {
                    timeout: connect_timeout,
                })
            }
        }
    }

    /// Run one command, waiting at most `timeout_duration` for it to finish
    ///
    /// A non-zero exit status is returned as a normal [`CommandOutput`].
    ///
    /// # Errors
    /// Returns `ExecError::CommandTimeout` on timeout, `ExecError::NotConnected`
    /// or `ExecError::SessionClosed` when the session is not connected, or the
    /// transport's fault.
    pub async fn run(
        &mut self,
        cmd: &str,
        timeout_duration: Duration,
    ) -> Result<CommandOutput, ExecError> {
        if self.state == SessionState::Closed {
            return Err(ExecError::SessionClosed);
        }
        let handle = self.handle.as_mut().ok_or(ExecError::NotConnected)?;

        let start = Instant::now();
        let result = timeout(timeout_duration, handle.run(cmd))
            .instrument(self.span.clone())
            .await;

        match result {
            Ok(result) => result,
            Err(_) => {
                self.span.in_scope(|| {
                    error!(
                        command = %cmd,
                        timeout = ?timeout_duration,
                        elapsed = ?start.elapsed(),
                        "command timed out"
                    );
                });
                Err(ExecError::CommandTimeout {
                    timeout: timeout_duration,
                })
            }
        }
    }

    /// Release the transport handle
    ///
    /// Safe to call any number of times, including on a session that never
    /// connected. Disconnect failures are logged, not returned.
    pub async fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            let result = timeout(self.params.connect_timeout, handle.disconnect())
                .instrument(self.span.clone())
                .await;

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => self.span.in_scope(|| warn!(error = %e, "disconnect failed")),
                Err(_) => self.span.in_scope(|| warn!("disconnect timed out")),
            }
        }

        if self.state != SessionState::Closed {
            self.span.in_scope(|| debug!(from = %self.state, "session closed"));
            self.state = SessionState::Closed;
        }
    }
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        if self.handle.is_some() {
            // dropping the handle tears the connection down
            self.span
                .in_scope(|| debug!("session dropped while connected"));
        }
    }
}
