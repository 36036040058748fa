//! Open-circuit estimates and Isc stabilisation polling.

use serde::Serialize;
use tracer_traits::{AdcBus, Channel};
use tracing::{debug, warn};

use crate::error::Result;
use crate::hw_error::hw_report;

/// Estimates taken with the relay open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpenCircuit {
    /// Largest voltage reading seen.
    pub voc: u16,
    /// Smallest current reading seen; the current channel's zero offset.
    pub zero_current: u16,
}

/// Sample Voc and the current zero offset. The relay must be open.
pub fn measure_open_circuit<A: AdcBus + ?Sized>(
    adc: &mut A,
    voc_samples: u16,
    zero_samples: u16,
) -> Result<OpenCircuit> {
    let mut voc = 0u16;
    for _ in 0..voc_samples.max(1) {
        voc = voc.max(adc.read_channel(Channel::Voltage).map_err(hw_report)?);
    }
    let mut zero_current = u16::MAX;
    for _ in 0..zero_samples.max(1) {
        zero_current = zero_current.min(adc.read_channel(Channel::Current).map_err(hw_report)?);
    }
    debug!(voc, zero_current, "open circuit sampled");
    Ok(OpenCircuit { voc, zero_current })
}

/// Last three current samples, oldest first. Starts zero-filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StabilityWindow {
    oldest: u16,
    middle: u16,
    newest: u16,
}

impl StabilityWindow {
    pub fn push(&mut self, sample: u16) {
        self.oldest = self.middle;
        self.middle = self.newest;
        self.newest = sample;
    }

    pub fn oldest(&self) -> u16 {
        self.oldest
    }

    /// Non-increasing, each step dropping at most `tolerance`, and the oldest
    /// sample strictly above `min_isc`.
    pub fn is_stable(&self, tolerance: u16, min_isc: u16) -> bool {
        self.oldest >= self.middle
            && self.middle >= self.newest
            && self.oldest - self.middle <= tolerance
            && self.middle - self.newest <= tolerance
            && self.oldest > min_isc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IscOutcome {
    pub isc: u16,
    /// Current samples read while polling.
    pub polls: u32,
    /// `false` when the poll limit ran out; `isc` is then a best effort.
    pub stable: bool,
}

/// Poll the current channel until three consecutive samples look stable.
///
/// The relay must already be closed. Running out of polls is not an error.
pub fn poll_isc<A: AdcBus + ?Sized>(
    adc: &mut A,
    max_polls: u32,
    tolerance: u16,
    min_isc: u16,
) -> Result<IscOutcome> {
    let mut window = StabilityWindow::default();
    let mut polls = 0u32;
    while polls < max_polls.max(1) {
        window.push(adc.read_channel(Channel::Current).map_err(hw_report)?);
        polls += 1;
        if window.is_stable(tolerance, min_isc) {
            debug!(isc = window.oldest(), polls, "isc stable");
            return Ok(IscOutcome {
                isc: window.oldest(),
                polls,
                stable: true,
            });
        }
    }
    warn!(isc = window.oldest(), polls, "isc did not stabilize");
    Ok(IscOutcome {
        isc: window.oldest(),
        polls,
        stable: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_needs_three_real_samples() {
        let mut w = StabilityWindow::default();
        w.push(500);
        assert!(!w.is_stable(5, 20));
        w.push(499);
        assert!(!w.is_stable(5, 20));
        w.push(498);
        assert!(w.is_stable(5, 20));
        assert_eq!(w.oldest(), 500);
    }

    #[test]
    fn rising_samples_are_unstable() {
        let mut w = StabilityWindow::default();
        for s in [100, 101, 102] {
            w.push(s);
        }
        assert!(!w.is_stable(5, 20));
    }

    #[test]
    fn oldest_must_exceed_minimum() {
        let mut w = StabilityWindow::default();
        for s in [20, 20, 20] {
            w.push(s);
        }
        assert!(!w.is_stable(5, 20));
        assert!(w.is_stable(5, 19));
    }
}
