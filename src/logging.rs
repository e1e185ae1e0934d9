use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact stdout logging. Default level is `info` (this crate at `debug`),
/// override with `RUST_LOG`.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,budget_tracker=debug,tower_http=info"));

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .compact();

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init();

    tracing::debug!("Tracing initialized");
}
