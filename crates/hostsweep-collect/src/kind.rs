//! Collector selection

use std::str::FromStr;
use std::sync::Arc;

use hostsweep_core::{CommandExecutor, ExecutorFactory};
use serde::{Deserialize, Serialize};

use crate::error::CollectError;
use crate::facts::SystemFacts;
use crate::metrics::SystemMetrics;

/// Which executor to run against every host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectorKind {
    /// Hostname, kernel and uptime as text
    #[default]
    Facts,
    /// CPU, memory, disk and uptime as typed metrics
    Metrics,
}

impl CollectorKind {
    /// Every collector, in display order
    pub const ALL: [CollectorKind; 2] = [CollectorKind::Facts, CollectorKind::Metrics];

    /// Name as accepted on the command line
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CollectorKind::Facts => "facts",
            CollectorKind::Metrics => "metrics",
        }
    }

    /// Build a fresh executor
    #[must_use]
    pub fn executor(self) -> Box<dyn CommandExecutor> {
        match self {
            CollectorKind::Facts => Box::new(SystemFacts),
            CollectorKind::Metrics => Box::new(SystemMetrics),
        }
    }

    /// Factory that builds one executor of this kind per host
    #[must_use]
    pub fn factory(self) -> Arc<dyn ExecutorFactory> {
        Arc::new(move |_host: &str| self.executor())
    }
}

impl std::fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectorKind {
    type Err = CollectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CollectError::UnknownCollector(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("facts".parse::<CollectorKind>(), Ok(CollectorKind::Facts));
        assert_eq!("METRICS".parse::<CollectorKind>(), Ok(CollectorKind::Metrics));
        assert_eq!(
            "disk".parse::<CollectorKind>(),
            Err(CollectError::UnknownCollector("disk".to_string()))
        );
    }

    #[test]
    fn test_factory_builds_matching_executor() {
        let factory = CollectorKind::Metrics.factory();
        let executor = factory.create("web1");
        assert_eq!(executor.name(), "metrics");
        assert_eq!(executor.commands().len(), 4);

        let executor = CollectorKind::Facts.factory().create("web1");
        assert_eq!(executor.name(), "facts");
    }

    #[test]
    fn test_serde_names() {
        let kind: CollectorKind = serde_json::from_str("\"metrics\"").unwrap();
        assert_eq!(kind, CollectorKind::Metrics);
        assert_eq!(CollectorKind::Facts.to_string(), "facts");
    }
}
