//! hostsweep-collect: ready-made command executors
//!
//! [`SystemFacts`] gathers identifying facts (hostname, kernel, uptime) as
//! raw text; [`SystemMetrics`] gathers CPU, memory, disk and uptime and
//! parses them into typed [`Metric`] values.

pub mod error;
pub mod facts;
pub mod kind;
pub mod metrics;

pub use error::{CollectError, MetricError};
pub use facts::{Fact, SystemFacts};
pub use kind::CollectorKind;
pub use metrics::{CpuCount, DiskUsage, MemoryUsage, Metric, SystemMetrics, Uptime};
