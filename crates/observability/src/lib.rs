//! Logging setup shared by the stockpos binaries.

pub mod logging;

pub use logging::{LogFormat, ParseLogFormatError};

/// Initialize process-wide logging in the given format.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    logging::init(format);
}
