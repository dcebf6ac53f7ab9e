use std::io;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset. Keeps stdout free for the result line.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the global stderr subscriber.
///
/// Calling it again leaves the first subscriber in place.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
