//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::NetConfig;

/// The filter directive used when `RUST_LOG` is unset.
pub fn default_directive(config: &NetConfig) -> &'static str {
    if config.debugging {
        "debug"
    } else if config.logging {
        "info"
    } else {
        "warn"
    }
}

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to a
/// level derived from `config`.
///
/// Does nothing if a global subscriber is already installed, so tests and
/// embedding applications can call it freely.
pub fn init(config: &NetConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(?config, "logging initialized");
    }
}
