//! Logging bootstrap based on `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "debug,orrery=trace";

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over [`DEFAULT_FILTER`]. Calling this more than
/// once (e.g. from several tests) is harmless; later calls are ignored.
pub fn init() {
    init_with_filter(DEFAULT_FILTER);
}

/// Installs the global fmt subscriber with a fallback filter directive.
pub fn init_with_filter(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        tracing::trace!("global subscriber already installed");
    }
}
