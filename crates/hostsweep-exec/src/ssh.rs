//! SSH transport using russh crate

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use russh::keys::ssh_key;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key};
use russh::{ChannelMsg, Disconnect, client};
use tracing::{debug, info, instrument, warn};

use crate::error::ExecError;
use crate::keys::validate_identity_file;
use crate::result::{CommandOutput, ConnectionParams};
use crate::traits::{Transport, TransportHandle};

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Accept all server keys (like StrictHostKeyChecking=no)
        Ok(true)
    }
}

/// SSH transport
///
/// Authenticates with the resolved identity file when there is one, otherwise
/// with the identities held by the running ssh-agent.
#[derive(Debug, Clone, Default)]
pub struct SshTransport {
    /// Reject identity files readable by group/other
    strict_key_permissions: bool,
}

impl SshTransport {
    /// Create a new SSH transport
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse identity files whose permissions are wider than 600
    #[must_use]
    pub fn with_strict_key_permissions(mut self, strict: bool) -> Self {
        self.strict_key_permissions = strict;
        self
    }

    async fn authenticate(
        &self,
        session: &mut client::Handle<SshClientHandler>,
        params: &ConnectionParams,
    ) -> Result<(), ExecError> {
        if let Some(key_path) = &params.identity_file {
            if self.strict_key_permissions {
                validate_identity_file(key_path)
                    .map_err(|e| ExecError::SshKeyError(e.to_string()))?;
            }

            let key_pair = load_secret_key(key_path, None)
                .map_err(|e| ExecError::SshKeyError(e.to_string()))?;

            let hash_alg = session
                .best_supported_rsa_hash()
                .await
                .ok()
                .flatten()
                .flatten();
            let auth_res = session
                .authenticate_publickey(
                    &params.username,
                    PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg),
                )
                .await
                .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

            if !auth_res.success() {
                return Err(ExecError::AuthenticationFailed(
                    "public key authentication failed".to_string(),
                ));
            }
            return Ok(());
        }

        self.authenticate_with_agent(session, params).await
    }

    #[cfg(unix)]
    async fn authenticate_with_agent(
        &self,
        session: &mut client::Handle<SshClientHandler>,
        params: &ConnectionParams,
    ) -> Result<(), ExecError> {
        let mut agent = russh::keys::agent::client::AgentClient::connect_env()
            .await
            .map_err(|e| {
                ExecError::AuthenticationFailed(format!("no identity file and no ssh-agent: {e}"))
            })?;

        let identities = agent
            .request_identities()
            .await
            .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

        if identities.is_empty() {
            return Err(ExecError::AuthenticationFailed(
                "ssh-agent has no identities".to_string(),
            ));
        }

        for identity in identities {
            let hash_alg = session
                .best_supported_rsa_hash()
                .await
                .ok()
                .flatten()
                .flatten();
            let result = session
                .authenticate_publickey_with(&params.username, identity, hash_alg, &mut agent)
                .await;

            if let Ok(auth_res) = result
                && auth_res.success()
            {
                return Ok(());
            }
        }

        Err(ExecError::AuthenticationFailed(
            "no ssh-agent identity was accepted".to_string(),
        ))
    }

    #[cfg(not(unix))]
    async fn authenticate_with_agent(
        &self,
        _session: &mut client::Handle<SshClientHandler>,
        _params: &ConnectionParams,
    ) -> Result<(), ExecError> {
        Err(ExecError::AuthenticationFailed(
            "no identity file available".to_string(),
        ))
    }
}

#[async_trait]
impl Transport for SshTransport {
    #[instrument(skip(self, params), fields(host = %params.host, hostname = %params.hostname))]
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn TransportHandle>, ExecError> {
        info!(
            port = params.port,
            user = %params.username,
            identity = ?params.identity_file,
            "connecting to SSH"
        );

        let config = Arc::new(client::Config::default());

        let mut session = client::connect(
            config,
            (&params.hostname[..], params.port),
            SshClientHandler,
        )
        .await
        .map_err(|e| ExecError::ConnectionFailed(e.to_string()))?;

        self.authenticate(&mut session, params).await?;

        info!("SSH connected and authenticated");

        Ok(Box::new(SshHandle {
            host: params.host.clone(),
            session: Some(session),
        }))
    }

    fn transport_type(&self) -> &'static str {
        "ssh"
    }
}

/// One authenticated SSH connection
struct SshHandle {
    host: String,
    session: Option<client::Handle<SshClientHandler>>,
}

#[async_trait]
impl TransportHandle for SshHandle {
    async fn run(&mut self, cmd: &str) -> Result<CommandOutput, ExecError> {
        let session = self.session.as_mut().ok_or(ExecError::NotConnected)?;

        debug!(host = %self.host, command = %cmd, "executing remote command");

        let start = Instant::now();

        let mut channel = session
            .channel_open_session()
            .await
            .map_err(|e| ExecError::ChannelError(e.to_string()))?;

        channel
            .exec(true, cmd)
            .await
            .map_err(|e| ExecError::ChannelError(e.to_string()))?;

        let mut status = -1;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        // exit-status may arrive after EOF, so read until the channel closes
        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    status = exit_status.cast_signed();
                }
                Some(ChannelMsg::Close) | None => break,
                _ => {}
            }
        }

        let duration = start.elapsed();

        debug!(
            host = %self.host,
            command = %cmd,
            status = status,
            duration = ?duration,
            "remote command completed"
        );

        Ok(CommandOutput {
            status,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
            duration,
        })
    }

    async fn disconnect(&mut self) -> Result<(), ExecError> {
        if let Some(session) = self.session.take() {
            session
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
                .map_err(|e| {
                    warn!(host = %self.host, error = %e, "SSH disconnect failed");
                    ExecError::ChannelError(e.to_string())
                })?;
            info!(host = %self.host, "SSH disconnected");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_connect_refused() {
        // port 1 on localhost is essentially never listening
        let params = ConnectionParams::new("localhost", "nobody")
            .with_hostname("127.0.0.1")
            .with_port(1)
            .with_connect_timeout(Duration::from_secs(2));

        let result = SshTransport::new().connect(&params).await;
        assert!(matches!(result, Err(ExecError::ConnectionFailed(_))));
    }

    #[tokio::test]
    #[ignore = "requires SSH server"]
    async fn test_ssh_roundtrip() {
        let user = std::env::var("USER").unwrap();
        let params = ConnectionParams::new("localhost", user);
        let mut handle = SshTransport::new().connect(&params).await.unwrap();

        let output = handle.run("echo hello").await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");

        handle.disconnect().await.unwrap();
    }
}
