use tracing_subscriber::{fmt, EnvFilter};

/// Initializes tracing. RUST_LOG wins when set; otherwise the DEBUG config
/// flag picks between debug and info.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();
}
