//! Tracing subscriber setup for hosts embedding the engine.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install a fmt subscriber on stderr.
///
/// `filter` takes precedence over `RUST_LOG`; with neither set everything
/// at `info` and above is logged. Returns `false` if a global subscriber
/// was already installed, in which case nothing changes.
pub fn init_tracing(filter: Option<&str>) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(filter))
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Explicit directives, else `RUST_LOG`, else the default; unparsable
/// directives fall through to the next source
fn build_filter(filter: Option<&str>) -> EnvFilter {
    filter
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
