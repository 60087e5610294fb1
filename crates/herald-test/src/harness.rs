//! Test harness helpers.

use std::io::Write;

use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

/// Set up test logging with the given filter.
///
/// Output goes through the libtest writer so it is captured per test. Safe
/// to call from every test; only the first call installs a subscriber.
///
/// # Example
///
/// ```rust
/// herald_test::init_test_logging_with("herald_events=trace");
/// ```
pub fn init_test_logging_with(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Set up test logging from `RUST_LOG`, defaulting to `warn`.
pub fn init_test_logging() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    init_test_logging_with(&filter);
}

/// Create a temporary file with the given content, e.g. a config file.
///
/// The file is removed when the returned `NamedTempFile` is dropped.
///
/// # Panics
///
/// Panics if the file cannot be created or written.
#[must_use]
pub fn test_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file.flush().expect("Failed to flush temp file");
    file
}
