//! Fleet engine
//!
//! Runs one executor per host with at most `concurrency` hosts in flight.
//! Every host runs in its own task; a panic in one task is contained and
//! reported as a crashed host. Finished results flow to a single
//! [`ReportCollector`], which produces the aggregate report.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use kameo::prelude::*;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{Instrument, error, info, info_span, instrument, warn};

use crate::actor::{ReportCollector, ReportCollectorArgs};
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::executor::ExecutorFactory;
use crate::message::{FinishReport, RecordHostResult, RecordedCount};
use crate::report::{AggregateReport, HostResult, HostStatus};
use crate::runner::HostRunner;

/// Runs executors across a fleet of hosts
#[derive(Debug, Clone)]
pub struct Engine {
    runner: Arc<HostRunner>,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine
    ///
    /// The runner's connect and command timeouts are taken from `config`.
    pub fn new(runner: HostRunner, config: EngineConfig) -> Self {
        let runner = runner
            .with_connect_timeout(config.connect_timeout)
            .with_command_timeout(config.command_timeout);
        Self {
            runner: Arc::new(runner),
            config,
        }
    }

    /// Engine configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a fresh executor from `factory` against every host
    ///
    /// The report has exactly one result per distinct host token, in
    /// completion order. Repeated tokens are run once. This never fails as a
    /// whole: every host problem is reported in that host's result.
    #[instrument(skip_all, fields(hosts = hosts.len(), concurrency = self.config.concurrency))]
    pub async fn run_all(
        &self,
        hosts: Vec<String>,
        factory: Arc<dyn ExecutorFactory>,
    ) -> AggregateReport {
        let hosts = dedupe_hosts(hosts);
        let started_at = Utc::now();
        let collector = ReportCollector::spawn(ReportCollectorArgs { started_at });
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        info!(hosts = hosts.len(), "starting run");

        let tasks: Vec<_> = hosts
            .iter()
            .map(|host| {
                let host = host.clone();
                let runner = Arc::clone(&self.runner);
                let factory = Arc::clone(&factory);
                let semaphore = Arc::clone(&semaphore);
                let collector = collector.clone();

                tokio::spawn(async move {
                    // set once the host holds a worker slot
                    let host_started = Arc::new(OnceLock::new());
                    let worker = tokio::spawn({
                        let host = host.clone();
                        let host_started = Arc::clone(&host_started);
                        let span = info_span!("worker", host = %host);
                        async move {
                            let Ok(_permit) = semaphore.acquire_owned().await else {
                                return HostResult::failed(
                                    host,
                                    HostStatus::Crashed,
                                    "worker pool closed",
                                    Utc::now(),
                                );
                            };
                            let _ = host_started.set(Utc::now());
                            let executor = factory.create(&host);
                            runner.run(&host, executor.as_ref()).await
                        }
                        .instrument(span)
                    });

                    let result = match worker.await {
                        Ok(result) => result,
                        Err(e) => {
                            error!(host = %host, error = %e, "host task crashed");
                            HostResult::failed(
                                host.clone(),
                                HostStatus::Crashed,
                                crash_reason(e),
                                host_started.get().copied().unwrap_or(started_at),
                            )
                        }
                    };

                    if let Err(e) = collector.ask(RecordHostResult(result)).await {
                        warn!(host = %host, error = %e, "failed to record host result");
                    }
                })
            })
            .collect();

        for outcome in join_all(tasks).await {
            if let Err(e) = outcome {
                error!(error = %e, "result forwarding task failed");
            }
        }

        match collector.ask(RecordedCount).await {
            Ok(recorded) if recorded < hosts.len() => {
                warn!(recorded, expected = hosts.len(), "some hosts did not report");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not query report collector"),
        }

        let report = match collector
            .ask(FinishReport {
                expected: hosts.clone(),
            })
            .await
        {
            Ok(report) => report,
            Err(e) => {
                let err = CoreError::ActorError(e.to_string());
                error!(error = %err, "report collector failed");
                collector_failed_report(hosts, &err, started_at)
            }
        };
        collector.stop_gracefully().await.ok();

        let summary = report.summary();
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            partial = summary.partial,
            unreachable = summary.unreachable,
            unresolved = summary.unresolved,
            crashed = summary.crashed,
            "run finished"
        );

        report
    }
}

/// Report used when the collector is gone: every host is marked crashed
fn collector_failed_report(
    hosts: Vec<String>,
    err: &CoreError,
    started_at: DateTime<Utc>,
) -> AggregateReport {
    let results = hosts
        .into_iter()
        .map(|host| HostResult::failed(host, HostStatus::Crashed, err.to_string(), started_at))
        .collect();
    AggregateReport {
        results,
        started_at,
        finished_at: Utc::now(),
    }
}

/// Drop repeated host tokens, keeping the first occurrence
///
/// [`Engine::run_all`] applies this itself; callers use it to report the
/// number of hosts that will actually run.
pub fn dedupe_hosts(hosts: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(hosts.len());
    hosts
        .into_iter()
        .filter(|host| {
            let first = seen.insert(host.clone());
            if !first {
                warn!(host = %host, "ignoring repeated host");
            }
            first
        })
        .collect()
}

/// Describe why a host task ended without a result
fn crash_reason(err: JoinError) -> String {
    if !err.is_panic() {
        return "host task was cancelled".to_string();
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match message {
        Some(message) => format!("host task panicked: {message}"),
        None => "host task panicked".to_string(),
    }
}
