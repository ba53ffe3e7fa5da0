//! Logging setup.
//!
//! The render core only emits `tracing` events. Hosts that have no
//! subscriber of their own call [`init_logging`] once from their entry
//! point; repeated calls are no-ops.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the `EnvFilter` directives.
pub const LOG_ENV: &str = "CAMGL_LOG";

const DEFAULT_FILTER: &str = "info";

static LOGGING: OnceCell<bool> = OnceCell::new();

/// Install a `fmt` subscriber filtered by `CAMGL_LOG` (default `info`).
///
/// Returns `false` if another global subscriber was already installed.
pub fn init_logging() -> bool {
    *LOGGING.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(filter_from_env())
            .with_target(true)
            .try_init()
            .is_ok()
    })
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
