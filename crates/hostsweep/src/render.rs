//! Report output
//!
//! Plain text for people, JSON for scripts.

use std::borrow::Cow;
use std::io::{self, Write};

use hostsweep_collect::{CollectorKind, Fact, Metric};
use hostsweep_core::{AggregateReport, CommandRecord, HostResult, HostStatus};

/// Longest fact output shown in text mode
const MAX_FACT_CHARS: usize = 100;

/// Print the report as pretty JSON
///
/// # Errors
/// Returns error if writing fails
pub fn write_json(out: &mut impl Write, report: &AggregateReport) -> eyre::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

/// Print the report as text
///
/// # Errors
/// Returns error if writing fails
pub fn write_text(
    out: &mut impl Write,
    report: &AggregateReport,
    collector: CollectorKind,
) -> io::Result<()> {
    for result in &report.results {
        write_host(out, result, collector)?;
    }

    let summary = report.summary();
    writeln!(out)?;
    writeln!(
        out,
        "Summary: {}/{} hosts successful",
        summary.succeeded, summary.total
    )?;
    if summary.total != summary.succeeded {
        writeln!(
            out,
            "  partial: {}, unreachable: {}, unresolved: {}, crashed: {}",
            summary.partial, summary.unreachable, summary.unresolved, summary.crashed
        )?;
    }
    Ok(())
}

fn status_label(status: HostStatus) -> &'static str {
    match status {
        HostStatus::Succeeded => "SUCCESS",
        HostStatus::Partial => "PARTIAL",
        HostStatus::Unreachable | HostStatus::Unresolved | HostStatus::Crashed => "FAILED",
    }
}

fn write_host(out: &mut impl Write, result: &HostResult, collector: CollectorKind) -> io::Result<()> {
    writeln!(out)?;
    match &result.error {
        Some(error) => writeln!(
            out,
            "{} [{}] {} ({})",
            result.host,
            status_label(result.status),
            error,
            result.status
        )?,
        None => writeln!(out, "{} [{}]", result.host, status_label(result.status))?,
    }

    for record in &result.commands {
        if let Some(reason) = record.failure_reason() {
            writeln!(out, "  {}: FAILED ({})", record.command, reason)?;
            continue;
        }
        if let Some(error) = &record.parse_error {
            writeln!(out, "  {}: unreadable output ({})", record.command, error)?;
            continue;
        }
        match collector {
            CollectorKind::Facts => write_fact(out, record)?,
            CollectorKind::Metrics => write_metric(out, record)?,
        }
    }
    Ok(())
}

fn write_fact(out: &mut impl Write, record: &CommandRecord) -> io::Result<()> {
    let fact = record
        .parsed
        .clone()
        .and_then(|value| serde_json::from_value::<Fact>(value).ok());
    match fact {
        Some(fact) => writeln!(
            out,
            "  {}: {}",
            record.command,
            truncate(&fact.output, MAX_FACT_CHARS)
        ),
        None => writeln!(out, "  {}: ok", record.command),
    }
}

fn write_metric(out: &mut impl Write, record: &CommandRecord) -> io::Result<()> {
    let metric = record
        .parsed
        .clone()
        .and_then(|value| serde_json::from_value::<Metric>(value).ok());
    match metric {
        Some(Metric::CpuCount(cpu)) => writeln!(out, "  CPUs: {} {}", cpu.value, cpu.unit),
        Some(Metric::Memory(mem)) => writeln!(
            out,
            "  Memory: {}/{} {} ({:.1}% used, {} {} available)",
            mem.used_mb, mem.total_mb, mem.unit, mem.used_percent, mem.available_mb, mem.unit
        ),
        Some(Metric::DiskUsage(disk)) => writeln!(
            out,
            "  Disk: {}/{} ({}% used, {} available)",
            disk.used, disk.size, disk.used_percent, disk.available
        ),
        Some(Metric::Uptime(uptime)) => writeln!(out, "  Uptime: {}", uptime.value),
        None => writeln!(out, "  {}: ok", record.command),
    }
}

/// Cut `s` to at most `max` characters, marking the cut with `...`
fn truncate(s: &str, max: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max) {
        Some((idx, _)) => Cow::Owned(format!("{}...", &s[..idx])),
        None => Cow::Borrowed(s),
    }
}
