//! Log output setup for binaries built on the console core.
//!
//! Libraries only emit `tracing` events; installing a subscriber is the
//! binary's call. `RUST_LOG` overrides the default filter, e.g.
//! `RUST_LOG=jwgroup_session=debug`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a formatted stderr subscriber.
///
/// Does nothing if a global subscriber is already set, so tests and
/// embedding applications can call it freely.
pub fn init() {
    init_with_default(DEFAULT_FILTER);
}

/// Like [`init`], with a different fallback filter.
pub fn init_with_default(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(default_filter, "tracing initialised");
    }
}
