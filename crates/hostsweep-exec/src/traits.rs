//! Transport traits

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::{CommandOutput, ConnectionParams};

/// A way of opening shell connections to hosts
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open and authenticate one connection
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn TransportHandle>, ExecError>;

    /// Get transport type name
    fn transport_type(&self) -> &'static str;
}

/// One live connection produced by a [`Transport`]
#[async_trait]
pub trait TransportHandle: Send {
    /// Run a command to completion and capture its output
    async fn run(&mut self, cmd: &str) -> Result<CommandOutput, ExecError>;

    /// Tear down the connection
    async fn disconnect(&mut self) -> Result<(), ExecError>;
}
