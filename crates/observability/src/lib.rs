//! Process-wide logging setup.

/// Tracing subscriber installation.
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize logging for the process with the given output format.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init(format: LogFormat) {
    tracing::init(format);
}
