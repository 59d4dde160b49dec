//! System metrics collector
//!
//! Runs four shell one-liners and parses each into a typed [`Metric`].
//! Parsed values serialize with a `metric` tag, e.g.
//! `{"metric": "cpu_count", "value": 8, "unit": "cores"}`.

use hostsweep_core::{CommandExecutor, ParseError};
use hostsweep_exec::CommandOutput;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MetricError;

/// Command reporting the number of logical CPUs
pub const CPU_COUNT_COMMAND: &str = "grep -c ^processor /proc/cpuinfo";
/// Command reporting the `Mem:` line of `free -m`
pub const MEMORY_COMMAND: &str = "free -m | grep Mem";
/// Command reporting root filesystem usage
pub const DISK_COMMAND: &str = "df -h / | tail -1";
/// Command reporting time since boot
pub const UPTIME_COMMAND: &str = "uptime | awk '{print $3,$4}'";

/// Logical CPU count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuCount {
    /// Number of processors
    pub value: u32,
    /// Always `cores`
    pub unit: String,
}

/// Memory usage from `free -m`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// Total memory in MB
    pub total_mb: u64,
    /// Used memory in MB
    pub used_mb: u64,
    /// Available memory in MB
    pub available_mb: u64,
    /// Used share of total, rounded to one decimal
    pub used_percent: f64,
    /// Always `MB`
    pub unit: String,
}

/// Root filesystem usage from `df -h`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskUsage {
    /// Filesystem size, human readable
    pub size: String,
    /// Used space, human readable
    pub used: String,
    /// Available space, human readable
    pub available: String,
    /// Used percentage
    pub used_percent: u8,
}

/// Uptime as printed by `uptime`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uptime {
    /// e.g. `3 days,`
    pub value: String,
}

/// One parsed metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum Metric {
    /// Logical CPU count
    CpuCount(CpuCount),
    /// Memory usage
    Memory(MemoryUsage),
    /// Root disk usage
    DiskUsage(DiskUsage),
    /// Time since boot
    Uptime(Uptime),
}

impl Metric {
    /// Parse the output of one of the metric commands
    ///
    /// Returns `Ok(None)` for a command this collector does not know.
    ///
    /// # Errors
    /// Returns `MetricError::Malformed` when the output has the wrong shape
    pub fn parse(command: &str, stdout: &str) -> Result<Option<Self>, MetricError> {
        let output = stdout.trim();
        let metric = match command {
            CPU_COUNT_COMMAND => Metric::CpuCount(parse_cpu_count(output)?),
            MEMORY_COMMAND => Metric::Memory(parse_memory(output)?),
            DISK_COMMAND => Metric::DiskUsage(parse_disk(output)?),
            UPTIME_COMMAND => Metric::Uptime(Uptime {
                value: output.to_string(),
            }),
            _ => return Ok(None),
        };
        Ok(Some(metric))
    }
}

fn parse_cpu_count(output: &str) -> Result<CpuCount, MetricError> {
    let value = output
        .parse()
        .map_err(|e| MetricError::malformed("CPU count", format!("{e}")))?;
    Ok(CpuCount {
        value,
        unit: "cores".to_string(),
    })
}

/// `Mem: total used free shared buff/cache available`
fn parse_memory(output: &str) -> Result<MemoryUsage, MetricError> {
    let fields: Vec<&str> = output.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(MetricError::malformed(
            "memory",
            format!("expected at least 4 fields, got {}", fields.len()),
        ));
    }

    let number = |field: &str| {
        field
            .parse::<u64>()
            .map_err(|e| MetricError::malformed("memory", format!("{field:?}: {e}")))
    };
    let total_mb = number(fields[1])?;
    let used_mb = number(fields[2])?;
    let available_mb = number(fields[fields.len() - 1])?;

    #[allow(clippy::cast_precision_loss)]
    let used_percent = if total_mb == 0 {
        0.0
    } else {
        (used_mb as f64 / total_mb as f64 * 1000.0).round() / 10.0
    };

    Ok(MemoryUsage {
        total_mb,
        used_mb,
        available_mb,
        used_percent,
        unit: "MB".to_string(),
    })
}

/// `filesystem size used avail use% mounted-on`
fn parse_disk(output: &str) -> Result<DiskUsage, MetricError> {
    let fields: Vec<&str> = output.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(MetricError::malformed(
            "disk usage",
            format!("expected at least 5 fields, got {}", fields.len()),
        ));
    }

    let percent = fields[4].trim_end_matches('%');
    let used_percent = percent
        .parse()
        .map_err(|e| MetricError::malformed("disk usage", format!("{percent:?}: {e}")))?;

    Ok(DiskUsage {
        size: fields[1].to_string(),
        used: fields[2].to_string(),
        available: fields[3].to_string(),
        used_percent,
    })
}

/// Collects CPU, memory, disk and uptime metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMetrics;

impl CommandExecutor for SystemMetrics {
    fn name(&self) -> &str {
        "metrics"
    }

    fn commands(&self) -> Vec<String> {
        [CPU_COUNT_COMMAND, MEMORY_COMMAND, DISK_COMMAND, UPTIME_COMMAND]
            .iter()
            .map(|c| (*c).to_string())
            .collect()
    }

    fn parse_response(
        &self,
        command: &str,
        output: &CommandOutput,
    ) -> Result<serde_json::Value, ParseError> {
        if !output.success() {
            let stderr = output.stderr.trim();
            let reason = if stderr.is_empty() {
                "command failed".to_string()
            } else {
                stderr.to_string()
            };
            return Err(MetricError::CommandFailed(reason).into());
        }

        match Metric::parse(command, &output.stdout)? {
            Some(metric) => {
                serde_json::to_value(metric).map_err(|e| ParseError::new(e.to_string()))
            }
            None => {
                debug!(command, "no parser for command, keeping raw output");
                Ok(serde_json::json!({ "output": output.stdout.trim() }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn ok(stdout: &str) -> CommandOutput {
        CommandOutput {
            status: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
            duration: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_cpu_count() {
        let value = SystemMetrics
            .parse_response(CPU_COUNT_COMMAND, &ok("8\n"))
            .unwrap();
        assert_eq!(value, json!({ "metric": "cpu_count", "value": 8, "unit": "cores" }));
    }

    #[test]
    fn test_cpu_count_garbage() {
        let err = SystemMetrics
            .parse_response(CPU_COUNT_COMMAND, &ok("eight"))
            .unwrap_err();
        assert!(err.message.starts_with("failed to parse CPU count"));
    }

    #[test]
    fn test_memory() {
        let line = "Mem:           7951        2114        3050         231        2786        5327\n";
        let metric = Metric::parse(MEMORY_COMMAND, line).unwrap().unwrap();
        assert_eq!(
            metric,
            Metric::Memory(MemoryUsage {
                total_mb: 7951,
                used_mb: 2114,
                available_mb: 5327,
                used_percent: 26.6,
                unit: "MB".to_string(),
            })
        );
    }

    #[test]
    fn test_memory_zero_total() {
        let metric = Metric::parse(MEMORY_COMMAND, "Mem: 0 0 0 0 0 0").unwrap();
        let Some(Metric::Memory(mem)) = metric else {
            panic!("expected memory metric");
        };
        assert!(mem.used_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn test_memory_too_short() {
        let err = Metric::parse(MEMORY_COMMAND, "Mem: 10").unwrap_err();
        assert!(matches!(err, MetricError::Malformed { metric: "memory", .. }));
    }

    #[test]
    fn test_disk() {
        let value = SystemMetrics
            .parse_response(DISK_COMMAND, &ok("/dev/sda1  50G  21G  27G  44% /\n"))
            .unwrap();
        assert_eq!(
            value,
            json!({
                "metric": "disk_usage",
                "size": "50G",
                "used": "21G",
                "available": "27G",
                "used_percent": 44
            })
        );
    }

    #[test]
    fn test_uptime() {
        let value = SystemMetrics
            .parse_response(UPTIME_COMMAND, &ok("3 days,\n"))
            .unwrap();
        assert_eq!(value, json!({ "metric": "uptime", "value": "3 days," }));
    }

    #[test]
    fn test_non_zero_exit() {
        let mut output = ok("");
        output.status = 1;
        let err = SystemMetrics
            .parse_response(DISK_COMMAND, &output)
            .unwrap_err();
        assert_eq!(err.message, "command failed");

        output.stderr = "df: /: No such file\n".to_string();
        let err = SystemMetrics
            .parse_response(DISK_COMMAND, &output)
            .unwrap_err();
        assert_eq!(err.message, "df: /: No such file");
    }

    #[test]
    fn test_unknown_command_keeps_output() {
        let value = SystemMetrics.parse_response("whoami", &ok("root\n")).unwrap();
        assert_eq!(value, json!({ "output": "root" }));
    }

    #[test]
    fn test_metric_round_trips_from_json() {
        let value = json!({ "metric": "uptime", "value": "5 min," });
        let metric: Metric = serde_json::from_value(value).unwrap();
        assert_eq!(
            metric,
            Metric::Uptime(Uptime {
                value: "5 min,".to_string()
            })
        );
    }
}
