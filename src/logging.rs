//! Logging setup.
//!
//! By default, noisy library modules (hyper, reqwest, h2, rustls) are set to
//! `warn` level so business logs stay readable at `info`.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Noisy modules filtered to warn level unless overridden via `RUST_LOG`.
const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls", "tokio_util"];

fn build_filter(log_level: &str) -> EnvFilter {
    // Environment variable wins (allows override)
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut directives = String::from(log_level);
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{module}=warn"));
    }

    EnvFilter::new(&directives)
}

/// Initialize tracing with the given base level ("trace" .. "error").
pub fn init_logging(log_level: &str) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(build_filter(log_level))
        .with(fmt_layer)
        .try_init();

    tracing::info!(log_level = %log_level, "logging initialized");
}
