//! Tracing and logging setup shared by engine hosts and tests.

/// Initialize process-wide logging.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use self::tracing::{LOG_FORMAT_ENV, LogFormat, init_for_tests, init_with};
