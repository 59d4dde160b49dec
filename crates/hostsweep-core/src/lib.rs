//! hostsweep-core: Fleet execution engine
//!
//! Resolves host tokens into connection parameters, runs a command executor
//! against every host with bounded concurrency, and collects per-host results
//! through a single `ReportCollector` actor.

pub mod actor;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod hostlist;
pub mod message;
pub mod report;
pub mod resolver;
pub mod runner;
pub mod ssh_config;

pub use actor::{ReportCollector, ReportCollectorArgs};
pub use config::{
    CredentialOverrides, DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONCURRENCY, DEFAULT_CONNECT_TIMEOUT,
    EngineConfig,
};
pub use engine::{Engine, dedupe_hosts};
pub use error::{CoreError, ParseError, ResolutionError};
pub use executor::{CommandExecutor, ExecutorFactory};
pub use hostlist::{parse_host_list, read_host_file};
pub use message::{FinishReport, RecordHostResult, RecordedCount};
pub use report::{
    AggregateReport, CommandOutcome, CommandRecord, FleetSummary, HostResult, HostStatus,
};
pub use resolver::{ConnectionResolver, HostSpec};
pub use runner::HostRunner;
pub use ssh_config::{HostConfigEntry, HostConfigSource, NoHostConfig, SshConfig};
