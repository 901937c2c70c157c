//! Structured logging setup.
//!
//! `RUST_LOG` overrides `config.logging.level` when set, following the
//! usual `tracing-subscriber` convention.

use tracing_subscriber::EnvFilter;

pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
