//! hostsweep
//!
//! Runs a collector against every host in a host list, concurrently, and
//! prints a per-host report.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use eyre::WrapErr;
use hostsweep_core::{
    ConnectionResolver, Engine, HostConfigSource, HostRunner, SshConfig, dedupe_hosts,
    read_host_file,
};
use hostsweep_exec::{LocalTransport, SshTransport, Transport};
use tracing::info;

mod cli;
mod config;
mod logging;
mod render;

use cli::{Cli, TransportKind};
use config::{Config, expand_path};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let mut config = Config::load_default(cli.config.as_deref())?;
    config.apply_cli(&cli);

    logging::try_init(cli.debug, &config.log_level)
        .map_err(|e| eyre::eyre!("failed to initialize logging: {e}"))?;

    config.engine.validate()?;

    let hosts = read_host_file(&cli.hosts_file).wrap_err("could not read host list")?;
    let hosts = dedupe_hosts(hosts);
    if hosts.is_empty() {
        eyre::bail!("no hosts found in {}", cli.hosts_file.display());
    }

    let engine = build_engine(&config, cli.transport)?;

    if !cli.json {
        println!(
            "Running {} on {} hosts ({} at a time)...",
            config.collector,
            hosts.len(),
            config.engine.concurrency
        );
    }

    let mut report = engine.run_all(hosts, config.collector.factory()).await;
    report.sort_by_host();

    let mut stdout = std::io::stdout().lock();
    if cli.json {
        render::write_json(&mut stdout, &report)?;
    } else {
        render::write_text(&mut stdout, &report, config.collector)?;
    }
    stdout.flush()?;

    info!(success_rate = report.success_rate(), "done");

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Wire the resolver, transport and engine from configuration
fn build_engine(config: &Config, transport: TransportKind) -> Result<Engine> {
    let source: Arc<dyn HostConfigSource> = match &config.ssh.config_path {
        Some(path) => Arc::new(SshConfig::load(&expand_path(path))?),
        None => Arc::new(SshConfig::load_default()),
    };

    let resolver = ConnectionResolver::new(source).with_overrides(config.ssh.overrides());

    let transport: Arc<dyn Transport> = match transport {
        TransportKind::Ssh => Arc::new(SshTransport::new()),
        TransportKind::Local => Arc::new(LocalTransport::new()),
    };

    Ok(Engine::new(
        HostRunner::new(resolver, transport),
        config.engine.clone(),
    ))
}
