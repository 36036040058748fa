//! Why a sweep stopped.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Curve buffer reached the configured point count.
    PointsFull,
    /// Current settled near zero with no further movement towards Voc.
    Flattened,
    /// Emergency stop on the total measurement cap.
    MeasurementLimit,
}

impl EndReason {
    /// Normal terminations; the measurement cap is not one.
    pub fn is_normal(self) -> bool {
        !matches!(self, EndReason::MeasurementLimit)
    }
}
