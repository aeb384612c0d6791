use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber.
///
/// Output goes through the test writer so it is captured per test. The
/// filter comes from `RUST_LOG` and defaults to `warn`. Calling this more
/// than once is harmless.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
