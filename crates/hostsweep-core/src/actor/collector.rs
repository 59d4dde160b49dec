//! `ReportCollector`: single writer for per-host results
//!
//! Host tasks never share a result map. Each one sends its finished
//! [`HostResult`] here; the actor owns the only copy and hands back the
//! [`AggregateReport`] when the run is finished.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::message::{FinishReport, RecordHostResult, RecordedCount};
use crate::report::{AggregateReport, HostResult, HostStatus};

/// Arguments for spawning a `ReportCollector`
#[derive(Debug, Clone)]
pub struct ReportCollectorArgs {
    /// When the run started
    pub started_at: DateTime<Utc>,
}

impl Default for ReportCollectorArgs {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
        }
    }
}

/// Accumulates host results in completion order
pub struct ReportCollector {
    results: Vec<HostResult>,
    seen: HashSet<String>,
    started_at: DateTime<Utc>,
}

impl ReportCollector {
    fn record(&mut self, result: HostResult) -> Result<(), CoreError> {
        if !self.seen.insert(result.host.clone()) {
            warn!(host = %result.host, "ignoring duplicate host result");
            return Err(CoreError::DuplicateResult(result.host));
        }
        debug!(host = %result.host, status = %result.status, "recorded host result");
        self.results.push(result);
        Ok(())
    }
}

impl Actor for ReportCollector {
    type Args = ReportCollectorArgs;
    type Error = CoreError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        debug!(id = %actor_ref.id(), "ReportCollector starting");

        Ok(Self {
            results: Vec::new(),
            seen: HashSet::new(),
            started_at: args.started_at,
        })
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        debug!(reason = ?reason, recorded = self.results.len(), "ReportCollector stopping");
        Ok(())
    }
}

impl Message<RecordHostResult> for ReportCollector {
    type Reply = Result<(), CoreError>;

    async fn handle(
        &mut self,
        msg: RecordHostResult,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.record(msg.0)
    }
}

impl Message<FinishReport> for ReportCollector {
    type Reply = AggregateReport;

    async fn handle(
        &mut self,
        msg: FinishReport,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        for host in msg.expected {
            if !self.seen.contains(&host) {
                warn!(host = %host, "no result recorded, marking as crashed");
                let result = HostResult::failed(
                    host,
                    HostStatus::Crashed,
                    "host task ended without reporting a result",
                    self.started_at,
                );
                // `seen` was just checked, so this cannot be a duplicate
                let _ = self.record(result);
            }
        }

        let report = AggregateReport {
            results: std::mem::take(&mut self.results),
            started_at: self.started_at,
            finished_at: Utc::now(),
        };
        info!(hosts = report.len(), "report finished");
        report
    }
}

impl Message<RecordedCount> for ReportCollector {
    type Reply = usize;

    async fn handle(
        &mut self,
        _msg: RecordedCount,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use kameo::actor::Spawn;

    use super::*;

    fn ok(host: &str) -> HostResult {
        HostResult::connected(host, vec![], Utc::now())
    }

    #[tokio::test]
    async fn test_records_in_completion_order() {
        let collector = ReportCollector::spawn(ReportCollectorArgs::default());

        collector.ask(RecordHostResult(ok("b"))).await.unwrap();
        collector.ask(RecordHostResult(ok("a"))).await.unwrap();
        assert_eq!(collector.ask(RecordedCount).await.unwrap(), 2);

        let report = collector
            .ask(FinishReport {
                expected: vec!["a".to_string(), "b".to_string()],
            })
            .await
            .unwrap();
        let hosts: Vec<_> = report.results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, ["b", "a"]);

        collector.stop_gracefully().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_result_rejected() {
        let collector = ReportCollector::spawn(ReportCollectorArgs::default());

        collector.ask(RecordHostResult(ok("a"))).await.unwrap();
        let second = HostResult::failed("a", HostStatus::Unreachable, "x", Utc::now());
        assert!(collector.ask(RecordHostResult(second)).await.is_err());

        let report = collector
            .ask(FinishReport {
                expected: vec!["a".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report.results[0].status, HostStatus::Succeeded);

        collector.stop_gracefully().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_hosts_marked_crashed() {
        let collector = ReportCollector::spawn(ReportCollectorArgs::default());
        collector.ask(RecordHostResult(ok("a"))).await.unwrap();

        let report = collector
            .ask(FinishReport {
                expected: vec!["a".to_string(), "b".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(report.len(), 2);
        let b = report.get("b").unwrap();
        assert_eq!(b.status, HostStatus::Crashed);
        assert!(b.commands.is_empty());

        collector.stop_gracefully().await.unwrap();
    }
}
