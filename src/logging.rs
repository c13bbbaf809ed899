use tracing_subscriber::EnvFilter;

/// Initialize the stderr tracing subscriber. stdout is reserved for the
/// single JSON contract document, so every log line goes to stderr.
///
/// Respects `RUST_LOG`; defaults to `info` when unset.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
