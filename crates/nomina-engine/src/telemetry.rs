//! Tracing subscriber wiring for binaries and integration harnesses.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber, honoring `RUST_LOG` with an `info`
/// default. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
