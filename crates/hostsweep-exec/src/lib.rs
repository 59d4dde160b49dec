//! hostsweep-exec: Remote shell transport
//!
//! Provides the transport traits, an SSH transport built on russh, a local
//! `sh -c` transport, and the single-host `RemoteSession` wrapper.

pub mod error;
pub mod keys;
pub mod local;
pub mod result;
pub mod session;
pub mod ssh;
pub mod traits;

pub use error::ExecError;
pub use keys::{KeyError, expand_tilde, validate_identity_file};
pub use local::LocalTransport;
pub use result::{CommandOutput, ConnectionParams, DEFAULT_SSH_PORT};
pub use session::{RemoteSession, SessionState};
pub use ssh::SshTransport;
pub use traits::{Transport, TransportHandle};
