//! Maps `Box<dyn Error>` from trait boundaries to typed `TracerError`.
//!
//! The traits in `tracer_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `tracer_hardware::HwError` downcasting.

use crate::error::TracerError;

/// Map a trait-boundary error to a typed `TracerError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TracerError {
    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<tracer_hardware::error::HwError>() {
            return match hw {
                tracer_hardware::error::HwError::Timeout => TracerError::Timeout,
                other => TracerError::HardwareFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        TracerError::Timeout
    } else {
        TracerError::Hardware(s)
    }
}

/// Wrap a trait-boundary error into an `eyre::Report` carrying a `TracerError`.
#[inline]
pub(crate) fn hw_report(e: Box<dyn std::error::Error + Send + Sync>) -> eyre::Report {
    eyre::Report::new(map_hw_error(&*e))
}
