//! Actor implementations

pub mod collector;

pub use collector::{ReportCollector, ReportCollectorArgs};
