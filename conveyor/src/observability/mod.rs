//! Logging setup for hosting processes.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber writing formatted logs to stderr.
///
/// The filter is taken from `RUST_LOG` when set, defaulting to `info`.
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
