//! Tracing and logging setup shared by every binary of the platform.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops and
/// return `false`.
pub fn init(config: &ObservabilityConfig) -> bool {
    tracing::init(config)
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::{LogFormat, ObservabilityConfig, ParseLogFormatError};
