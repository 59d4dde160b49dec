//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use hostsweep_collect::CollectorKind;

/// Run a collector against every host in a host list over SSH
#[derive(Debug, Parser)]
#[command(name = "hostsweep", version)]
#[command(about = "Run commands concurrently across a fleet of hosts over SSH", long_about = None)]
pub struct Cli {
    /// File with one host per line (`host` or `user@host`, `#` comments)
    #[arg(short = 'f', long)]
    pub hosts_file: PathBuf,

    /// SSH username for every host
    #[arg(short, long)]
    pub username: Option<String>,

    /// SSH identity file for every host
    #[arg(long, env = "SSH_IDENTITY_FILE")]
    pub identity_file: Option<PathBuf>,

    /// Maximum number of hosts worked on at once [default: 10]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// What to collect (facts, metrics) [default: facts]
    #[arg(long)]
    pub collector: Option<CollectorKind>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Path to hostsweep.toml
    #[arg(long, env = "HOSTSWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// OpenSSH client config to read per-host settings from [default: ~/.ssh/config]
    #[arg(long)]
    pub ssh_config: Option<PathBuf>,

    /// Connect timeout in seconds [default: 10]
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Per-command timeout in seconds [default: 30]
    #[arg(long)]
    pub command_timeout: Option<u64>,

    /// How commands reach the hosts
    #[arg(long, value_enum, default_value_t = TransportKind::Ssh)]
    pub transport: TransportKind,
}

/// Command transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// Connect to each host over SSH
    Ssh,
    /// Run each host's commands on this machine with `sh -c`
    Local,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_full() {
        let cli = Cli::try_parse_from([
            "hostsweep",
            "-f",
            "hosts.txt",
            "-u",
            "ops",
            "-w",
            "4",
            "--collector",
            "metrics",
            "--json",
            "--connect-timeout",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.hosts_file, PathBuf::from("hosts.txt"));
        assert_eq!(cli.username.as_deref(), Some("ops"));
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.collector, Some(CollectorKind::Metrics));
        assert!(cli.json);
        assert_eq!(cli.connect_timeout, Some(5));
        assert_eq!(cli.command_timeout, None);
        assert_eq!(cli.transport, TransportKind::Ssh);
    }

    #[test]
    fn test_hosts_file_required() {
        assert!(Cli::try_parse_from(["hostsweep"]).is_err());
    }

    #[test]
    fn test_unknown_collector_rejected() {
        assert!(Cli::try_parse_from(["hostsweep", "-f", "h", "--collector", "disk"]).is_err());
    }
}
