//! Process-wide tracing setup.

pub mod logging;

pub use logging::{LogConfig, LogFormat, LogFormatError};

/// Initialize logging from the environment (`RUST_LOG`, `HRDESK_LOG_FORMAT`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    logging::init(&LogConfig::from_env());
}
