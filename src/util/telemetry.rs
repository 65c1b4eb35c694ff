//! Tracing subscriber setup for run binaries and tests.

use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is unset: engine lines at `info`,
/// dependencies at `warn`.
pub const DEFAULT_DIRECTIVES: &str = "warn,slot_sniper=info";

/// Filter from `RUST_LOG`, or `fallback` when it is unset or unparsable.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install a fmt subscriber unless one is already set. Returns true when this
/// call installed it.
///
/// Targets stay on so JSON outcome lines (`slot_sniper::outcome`) can be
/// filtered apart from the human-readable ones.
pub fn init_tracing() -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(DEFAULT_DIRECTIVES))
        .with_target(true)
        .try_init()
        .is_ok()
}
