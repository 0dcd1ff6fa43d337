//! Logging setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` and falls back to `default_filter`
/// (e.g. `"info"` or `"homestead_world=debug,info"`). Thread names are
/// shown because the server logs from both the simulation and network
/// threads.
///
/// Returns `false` if a global subscriber was already installed, which
/// happens when tests call this more than once.
pub fn init_logging(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}
