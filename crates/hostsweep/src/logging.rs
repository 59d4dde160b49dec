//! Logging initialization
//!
//! Logs go to stderr so `--json` output on stdout stays machine readable.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const CRATES: [&str; 4] = [
    "hostsweep",
    "hostsweep_core",
    "hostsweep_exec",
    "hostsweep_collect",
];

/// Build the log filter
///
/// `--debug` enables debug output for this tool's crates and `level` for
/// everything else. Without it, `RUST_LOG` wins when set, then `level`.
pub fn create_env_filter(debug: bool, level: &str) -> EnvFilter {
    if debug {
        let ours: Vec<String> = CRATES.iter().map(|c| format!("{c}=debug")).collect();
        let directives = format!("{level},{}", ours.join(","));
        return EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(ours.join(",")));
    }

    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize the logging system
///
/// # Errors
/// Returns `Err` if logging has already been initialized.
pub fn try_init(debug: bool, level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(create_env_filter(debug, level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()
}
