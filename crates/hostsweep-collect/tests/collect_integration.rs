use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use hostsweep_collect::*;
use hostsweep_core::{ConnectionResolver, Engine, EngineConfig, HostRunner, HostStatus};
use hostsweep_exec::{
    CommandOutput, ConnectionParams, ExecError, LocalTransport, Transport, TransportHandle,
};

/// Transport that answers every command from a fixed table
struct CannedTransport {
    answers: HashMap<String, CommandOutput>,
}

impl CannedTransport {
    fn new(answers: &[(&str, i32, &str)]) -> Self {
        let answers = answers
            .iter()
            .map(|(cmd, status, stdout)| {
                let output = CommandOutput {
                    status: *status,
                    stdout: (*stdout).to_string(),
                    stderr: String::new(),
                    duration: Duration::from_millis(1),
                };
                ((*cmd).to_string(), output)
            })
            .collect();
        Self { answers }
    }
}

#[async_trait]
impl Transport for CannedTransport {
    async fn connect(
        &self,
        _params: &ConnectionParams,
    ) -> Result<Box<dyn TransportHandle>, ExecError> {
        Ok(Box::new(CannedHandle {
            answers: self.answers.clone(),
        }))
    }

    fn transport_type(&self) -> &'static str {
        "canned"
    }
}

struct CannedHandle {
    answers: HashMap<String, CommandOutput>,
}

#[async_trait]
impl TransportHandle for CannedHandle {
    async fn run(&mut self, cmd: &str) -> Result<CommandOutput, ExecError> {
        self.answers
            .get(cmd)
            .cloned()
            .ok_or_else(|| ExecError::ChannelError(format!("no answer for {cmd}")))
    }

    async fn disconnect(&mut self) -> Result<(), ExecError> {
        Ok(())
    }
}

fn engine(transport: impl Transport + 'static) -> Engine {
    let resolver = ConnectionResolver::default().with_default_user(Some("ops".to_string()));
    Engine::new(
        HostRunner::new(resolver, Arc::new(transport)),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn test_metrics_across_fleet() {
    let transport = CannedTransport::new(&[
        ("grep -c ^processor /proc/cpuinfo", 0, "4\n"),
        ("free -m | grep Mem", 0, "Mem: 2000 500 1000 10 490 1400\n"),
        ("df -h / | tail -1", 0, "overlay 20G 5.0G 15G 25% /\n"),
        ("uptime | awk '{print $3,$4}'", 0, "2 days,\n"),
    ]);

    let report = engine(transport)
        .run_all(
            vec!["a".to_string(), "b".to_string()],
            CollectorKind::Metrics.factory(),
        )
        .await;

    assert_eq!(report.len(), 2);
    for result in &report.results {
        assert_eq!(result.status, HostStatus::Succeeded);
        let metrics: Vec<Metric> = result
            .commands
            .iter()
            .map(|c| serde_json::from_value(c.parsed.clone().unwrap()).unwrap())
            .collect();
        assert_eq!(metrics.len(), 4);
        assert!(matches!(&metrics[0], Metric::CpuCount(cpu) if cpu.value == 4));
        assert!(
            matches!(&metrics[1], Metric::Memory(mem) if (mem.used_percent - 25.0).abs() < 1e-9)
        );
        assert!(matches!(&metrics[2], Metric::DiskUsage(disk) if disk.used_percent == 25));
        assert!(matches!(&metrics[3], Metric::Uptime(up) if up.value == "2 days,"));
    }
}

#[tokio::test]
async fn test_failed_metric_marks_partial() {
    let transport = CannedTransport::new(&[
        ("grep -c ^processor /proc/cpuinfo", 0, "lots\n"),
        ("free -m | grep Mem", 0, "Mem: 2000 500 1000 10 490 1400\n"),
        ("df -h / | tail -1", 1, ""),
        ("uptime | awk '{print $3,$4}'", 0, "2 days,\n"),
    ]);

    let report = engine(transport)
        .run_all(vec!["a".to_string()], CollectorKind::Metrics.factory())
        .await;

    let result = report.get("a").unwrap();
    assert_eq!(result.status, HostStatus::Partial);
    let failed: Vec<_> = result.failed_commands().map(|c| c.command.as_str()).collect();
    assert_eq!(failed, ["df -h / | tail -1"]);

    let disk = result.command("df -h / | tail -1").unwrap();
    assert_eq!(disk.parse_error.as_deref(), Some("command failed"));

    // exit 0 with unreadable output still counts as a completed command
    let cpu = result.command("grep -c ^processor /proc/cpuinfo").unwrap();
    assert!(cpu.success);
    assert!(cpu.parsed.is_none());
    assert!(
        cpu.parse_error
            .as_deref()
            .unwrap()
            .starts_with("failed to parse CPU count")
    );
}

#[tokio::test]
async fn test_facts_over_local_transport() {
    let report = engine(LocalTransport::new())
        .run_all(vec!["localhost".to_string()], CollectorKind::Facts.factory())
        .await;

    let result = report.get("localhost").unwrap();
    assert_ne!(result.status, HostStatus::Unreachable);
    assert_eq!(result.commands.len(), 3);
    for record in &result.commands {
        let fact: Fact = serde_json::from_value(record.parsed.clone().unwrap()).unwrap();
        assert_eq!(fact.command, record.command);
    }
}
