//! Process-wide logging setup shared by the binaries.

pub mod tracing;

pub use crate::tracing::{DEFAULT_FILTER, ENV_LOG_FORMAT, LogFormat};

/// Install the global subscriber, picking the format from
/// `LABSTOCK_LOG_FORMAT` and the filter from `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let format = std::env::var(ENV_LOG_FORMAT)
        .ok()
        .and_then(|v| LogFormat::parse(&v))
        .unwrap_or_default();
    crate::tracing::init(format);
}
