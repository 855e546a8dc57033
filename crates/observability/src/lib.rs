//! Tracing/logging setup shared by every larder process.

/// Tracing configuration (filters, formatter).
pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat, LogFormatError};

/// Initialize process-wide logging with defaults (JSON, `info`, `RUST_LOG`
/// overrides).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(&LogConfig::default());
}

/// Initialize process-wide logging from explicit configuration.
pub fn init_with(config: &LogConfig) {
    tracing::init(config);
}
