//! Diagnostic logging.
//!
//! Progress narration is plain stdout. This subscriber only carries
//! diagnostics (every subprocess command line at `debug`) to stderr,
//! filtered by `RUST_LOG` and quiet (`warn`) by default.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
