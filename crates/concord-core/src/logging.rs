//! Opt-in `tracing` subscriber setup for processes embedding the decision core.

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global subscriber: an `EnvFilter` (honouring `RUST_LOG`, otherwise
/// `warn,concord_core=<level>`) and a JSON or pretty formatter depending on `config.format`.
///
/// Returns `false` when a global subscriber was already installed, which makes repeated calls
/// from tests harmless.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,concord_core={}", config.level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json();
        registry.with(fmt_layer).try_init().is_ok()
    } else {
        // "pretty" and any other format default to pretty logging
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).try_init().is_ok()
    }
}
